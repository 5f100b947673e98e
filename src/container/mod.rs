//! Container runtime integration for clean builds.
//!
//! The lifecycle orchestrator only talks to a [`ContainerRuntime`]. [`LxdRuntime`]
//! drives the `lxc` client; tests substitute in-memory fakes.
//!
//! # Module Structure
//!
//! - `lxd` - LXD-backed runtime
//! - `process` - Bounded `lxc` command execution with output capture

mod lxd;
mod process;

pub use lxd::LxdRuntime;
pub use process::{CommandOutput, run_command};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure reported by a container runtime operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{command}: {reason}")]
pub struct RuntimeError {
    /// Operation or command that failed
    pub command: String,
    /// Reason for the error
    pub reason: String,
}

impl RuntimeError {
    /// Error for a failed command
    pub fn new(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Result of the contained build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Exit status of the last build step that ran
    pub exit_code: i32,
    /// Captured output lines
    pub output: Vec<String>,
}

impl BuildOutcome {
    /// Whether the build exited zero
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Operations the clean build needs from a container runtime.
///
/// One runtime value owns one container for the duration of a build.
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// Name of the container this runtime manages
    fn container_name(&self) -> &str;

    /// Create (or acquire) the build container
    async fn ensure_environment(&self) -> Result<(), RuntimeError>;

    /// Push `host_archive` into `container_dir` and inflate it there
    async fn push_path(&self, container_dir: &str, host_archive: &Path)
    -> Result<(), RuntimeError>;

    /// Single reachability probe from inside the container
    async fn is_network_ready(&self) -> bool;

    /// Run the build tool in `container_dir`, producing `artifact_name` there
    async fn exec_build(
        &self,
        container_dir: &str,
        artifact_name: &str,
    ) -> Result<BuildOutcome, RuntimeError>;

    /// Copy `container_path` out of the container to `host_dest`
    async fn pull_artifact(
        &self,
        container_path: &str,
        host_dest: &Path,
    ) -> Result<PathBuf, RuntimeError>;

    /// Drop host-side registrations made for this build, leaving the container running
    async fn detach(&self) -> Result<(), RuntimeError>;

    /// Tear down the container, then [`detach`](ContainerRuntime::detach)
    async fn release(&self) -> Result<(), RuntimeError>;
}
