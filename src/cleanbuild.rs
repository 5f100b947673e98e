//! Top-level clean-build operation.
//!
//! Gates on the runtime dependency, snapshots the project, then hands the snapshot to
//! the lifecycle orchestrator and checksums what comes back.

use crate::checksum::calculate_sha256;
use crate::config::CleanBuildConfig;
use crate::container::ContainerRuntime;
use crate::error::{CleanBuildError, Result};
use crate::lifecycle::{BuildRequest, Orchestrator, Phase, ProgressReporter};
use crate::preflight::{self, DependencyProbe};
use crate::project::ProjectMetadata;
use crate::snapshot::{self, SnapshotArchive};
use std::path::PathBuf;

/// What a successful clean build leaves behind on the host
#[derive(Debug, Clone)]
pub struct CleanBuildOutcome {
    /// Source snapshot that was built
    pub archive: SnapshotArchive,
    /// Retrieved artifact, at the project root
    pub artifact: PathBuf,
    /// Hex SHA-256 of the artifact
    pub sha256: String,
}

/// Run one clean build of the project in `config.project_dir`.
///
/// The dependency check runs first, so a missing runtime fails before any archive
/// is written or container created.
pub async fn clean_build<D, R, P>(
    config: &CleanBuildConfig,
    probe: &D,
    runtime: &R,
    reporter: &P,
) -> Result<CleanBuildOutcome>
where
    D: DependencyProbe + ?Sized,
    R: ContainerRuntime,
    P: ProgressReporter + ?Sized,
{
    preflight::check(probe).await?;

    let project = ProjectMetadata::load(&config.project_dir)?;
    log::debug!(
        "Clean build of {} {} ({} part(s))",
        project.name,
        project.version,
        project.parts.len()
    );

    let archive = snapshot::package_project(&config.project_dir, &project).await?;

    let request = BuildRequest {
        archive: archive.path.clone(),
        artifact_name: project.snap_file_name(),
        output_dir: config.project_dir.clone(),
    };
    let session = Orchestrator::new(runtime, reporter, config.network)
        .run(&request)
        .await?;

    let artifact = session
        .artifact
        .unwrap_or_else(|| config.project_dir.join(&request.artifact_name));
    let sha256 = calculate_sha256(&artifact)
        .await
        .map_err(|e| CleanBuildError::Retrieval {
            phase: Phase::Retrieving,
            artifact: request.artifact_name.clone(),
            reason: format!("Failed to checksum {}: {}", artifact.display(), e),
        })?;
    log::debug!("{}: sha256 {}", artifact.display(), sha256);

    Ok(CleanBuildOutcome {
        archive,
        artifact,
        sha256,
    })
}
