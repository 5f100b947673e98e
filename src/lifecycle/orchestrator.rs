//! Sequential driver of the container lifecycle.
//!
//! Each phase's work runs to completion before [`Phase::advance`] picks the next
//! phase, and the entry event of the new phase is reported before its work starts.

use super::phase::{Phase, PhaseEvent};
use super::reporter::ProgressReporter;
use crate::config::NetworkWait;
use crate::container::{ContainerRuntime, RuntimeError};
use crate::error::{CleanBuildError, Result};
use std::path::{Path, PathBuf};
use tokio::time::Instant;

/// Directory inside the container the snapshot is inflated into and built from
pub const CONTAINER_PROJECT_DIR: &str = "/root";

/// Inputs of one lifecycle run
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Snapshot archive on the host
    pub archive: PathBuf,
    /// Artifact file name the build produces
    pub artifact_name: String,
    /// Host directory the artifact is retrieved into
    pub output_dir: PathBuf,
}

/// Ephemeral state of one clean build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSession {
    /// Current phase
    pub phase: Phase,
    /// Container owned by this session
    pub container: String,
    /// Archive location inside the container, once pushed
    pub pushed_archive: Option<String>,
    /// Retrieved artifact on the host, once pulled
    pub artifact: Option<PathBuf>,
}

impl BuildSession {
    fn new(container: &str) -> Self {
        Self {
            phase: Phase::Idle,
            container: container.to_string(),
            pushed_archive: None,
            artifact: None,
        }
    }
}

/// Drives a [`ContainerRuntime`] from `Idle` to `Done` or `Failed`.
pub struct Orchestrator<'a, R, P>
where
    R: ContainerRuntime,
    P: ProgressReporter + ?Sized,
{
    runtime: &'a R,
    reporter: &'a P,
    network: NetworkWait,
}

impl<'a, R, P> Orchestrator<'a, R, P>
where
    R: ContainerRuntime,
    P: ProgressReporter + ?Sized,
{
    /// Orchestrator over a runtime and reporter
    pub fn new(runtime: &'a R, reporter: &'a P, network: NetworkWait) -> Self {
        Self {
            runtime,
            reporter,
            network,
        }
    }

    /// Run the whole lifecycle.
    ///
    /// On success the container is released and the finished session returned. On
    /// failure the container is released too, except after a network timeout, where
    /// the runtime only detaches and the container is handed to the caller through
    /// the error.
    pub async fn run(&self, request: &BuildRequest) -> Result<BuildSession> {
        let mut session = BuildSession::new(self.runtime.container_name());

        while !session.phase.is_terminal() {
            let outcome = self.execute(&mut session, request).await;
            let next = session.phase.advance(outcome.is_ok());

            if let Err(err) = outcome {
                session.phase = next;
                log::debug!("Clean build failed: {}", err);
                if matches!(err, CleanBuildError::NetworkTimeout { .. }) {
                    self.detach().await;
                } else {
                    self.release().await;
                }
                return Err(err);
            }

            session.phase = next;
            if let Some(event) = PhaseEvent::on_enter(next, &self.artifact_label(&session, request)) {
                self.reporter.report(&event);
            }
        }

        self.release().await;
        Ok(session)
    }

    /// Work of the session's current phase.
    async fn execute(&self, session: &mut BuildSession, request: &BuildRequest) -> Result<()> {
        let phase = session.phase;
        match phase {
            Phase::Idle => self
                .runtime
                .ensure_environment()
                .await
                .map_err(|e| setup_error(phase, e)),
            Phase::SettingUp => {
                self.runtime
                    .push_path(CONTAINER_PROJECT_DIR, &request.archive)
                    .await
                    .map_err(|e| setup_error(phase, e))?;
                session.pushed_archive = request
                    .archive
                    .file_name()
                    .map(|name| format!("{}/{}", CONTAINER_PROJECT_DIR, name.to_string_lossy()));
                Ok(())
            }
            Phase::WaitingForNetwork => self.wait_for_network(session).await,
            Phase::NetworkReady => Ok(()),
            Phase::Building => {
                let outcome = self
                    .runtime
                    .exec_build(CONTAINER_PROJECT_DIR, &request.artifact_name)
                    .await
                    .map_err(|e| CleanBuildError::BuildExecution {
                        phase,
                        exit_code: -1,
                        output: vec![e.to_string()],
                    })?;
                if outcome.success() {
                    Ok(())
                } else {
                    Err(CleanBuildError::BuildExecution {
                        phase,
                        exit_code: outcome.exit_code,
                        output: outcome.output,
                    })
                }
            }
            Phase::Retrieving => {
                let container_path =
                    format!("{}/{}", CONTAINER_PROJECT_DIR, request.artifact_name);
                let host_dest = request.output_dir.join(&request.artifact_name);
                let artifact = self
                    .runtime
                    .pull_artifact(&container_path, &host_dest)
                    .await
                    .map_err(|e| CleanBuildError::Retrieval {
                        phase,
                        artifact: request.artifact_name.clone(),
                        reason: e.to_string(),
                    })?;
                session.artifact = Some(artifact);
                Ok(())
            }
            Phase::Done | Phase::Failed => Ok(()),
        }
    }

    /// Poll reachability until it succeeds or the bound runs out.
    async fn wait_for_network(&self, session: &BuildSession) -> Result<()> {
        let started = Instant::now();
        let deadline = started + self.network.timeout;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.runtime.is_network_ready()).await {
                Ok(true) => {
                    log::debug!("Network reachable after {} probe(s)", attempt);
                    return Ok(());
                }
                Ok(false) => log::debug!("Network probe {} failed", attempt),
                Err(_) => break,
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(self.network.poll_interval.min(deadline - now)).await;
        }

        Err(CleanBuildError::NetworkTimeout {
            phase: session.phase,
            container: session.container.clone(),
            waited: started.elapsed(),
        })
    }

    /// Name reported for the retrieved artifact: the pulled file's actual name.
    fn artifact_label(&self, session: &BuildSession, request: &BuildRequest) -> String {
        session
            .artifact
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.artifact_name.clone())
    }

    async fn detach(&self) {
        if let Err(e) = self.runtime.detach().await {
            log::warn!(
                "Failed to detach from container {}: {}",
                self.runtime.container_name(),
                e
            );
        }
    }

    async fn release(&self) {
        if let Err(e) = self.runtime.release().await {
            log::warn!(
                "Failed to release container {}: {}",
                self.runtime.container_name(),
                e
            );
        }
    }
}

fn setup_error(phase: Phase, err: RuntimeError) -> CleanBuildError {
    CleanBuildError::ContainerSetup {
        phase,
        reason: err.to_string(),
    }
}
