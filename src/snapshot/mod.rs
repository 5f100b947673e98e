//! Portable source snapshots of a project tree.
//!
//! The snapshot carries everything authored with the project and leaves out the
//! residue of earlier host-side builds, so it can be inflated into any directory.

mod archive;
mod policy;

pub use archive::{SnapshotArchive, package};
pub use policy::{ExclusionPolicy, PARTIAL_ARCHIVE_PREFIX, Verdict};

use crate::error::{CleanBuildError, CliError, Result};
use crate::project::{ProjectLayout, ProjectMetadata};
use std::path::Path;

/// Package the project's snapshot off the async runtime.
pub async fn package_project(
    project_dir: &Path,
    project: &ProjectMetadata,
) -> Result<SnapshotArchive> {
    let layout = ProjectLayout::new();
    let policy = ExclusionPolicy::new(&layout, project.source_archive_name());
    let root = project_dir.to_path_buf();

    tokio::task::spawn_blocking(move || package(&root, &policy))
        .await
        .map_err(|e| {
            CleanBuildError::Cli(CliError::ExecutionFailed {
                command: "package snapshot".to_string(),
                reason: format!("Task panicked: {}", e),
            })
        })?
}
