//! Error types for clean-build operations.
//!
//! Every failure reaches the caller as its own variant. Apart from the dependency
//! error, whose text is a fixed support instruction, each message names the phase
//! in which the failure happened.

use crate::lifecycle::Phase;
use crate::preflight::DependencyError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for clean-build operations
pub type Result<T> = std::result::Result<T, CleanBuildError>;

/// Main error type for all clean-build operations
#[derive(Error, Debug)]
pub enum CleanBuildError {
    /// Container runtime is not installed on the host
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// snapcraft.yaml is missing or malformed
    #[error("Project metadata error in {}: {reason}", .path.display())]
    Manifest {
        /// Manifest path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Snapshot packaging failed before any container was touched
    #[error("Packaging failed at {}: {source}", .path.display())]
    Packaging {
        /// Offending path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Container creation or asset push failed
    #[error("Container setup failed while {phase}: {reason}")]
    ContainerSetup {
        /// Phase in which the failure happened
        phase: Phase,
        /// Reason for the error
        reason: String,
    },

    /// Container never reached the network within the configured bound
    #[error(
        "Network connection not established after {}s while {phase}; container {container} was left running for inspection",
        .waited.as_secs()
    )]
    NetworkTimeout {
        /// Phase in which the failure happened
        phase: Phase,
        /// Container handed off to the caller
        container: String,
        /// Time spent polling
        waited: Duration,
    },

    /// Contained build exited nonzero
    #[error("Build failed while {phase} with exit status {exit_code}{}", render_output(.output))]
    BuildExecution {
        /// Phase in which the failure happened
        phase: Phase,
        /// Exit status of the build tool
        exit_code: i32,
        /// Captured build output
        output: Vec<String>,
    },

    /// Artifact could not be pulled out of the container
    #[error("Retrieval of {artifact} failed while {phase}: {reason}")]
    Retrieval {
        /// Phase in which the failure happened
        phase: Phase,
        /// Expected artifact name
        artifact: String,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

/// Number of trailing build output lines carried into the error message.
const OUTPUT_TAIL: usize = 20;

fn render_output(output: &[String]) -> String {
    if output.is_empty() {
        return String::new();
    }
    let start = output.len().saturating_sub(OUTPUT_TAIL);
    format!("\n{}", output[start..].join("\n"))
}

impl CleanBuildError {
    /// Lifecycle phase this failure belongs to, if it happened inside the container lifecycle.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::ContainerSetup { phase, .. }
            | Self::NetworkTimeout { phase, .. }
            | Self::BuildExecution { phase, .. }
            | Self::Retrieval { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            // The dependency message is already a complete instruction.
            Self::Dependency(_) => Vec::new(),
            Self::Manifest { .. } => {
                vec!["Check that snapcraft.yaml defines `name` and `version`".to_string()]
            }
            Self::Packaging { path, .. } => vec![format!(
                "Check that {} is readable and the project directory is writable",
                path.display()
            )],
            Self::NetworkTimeout { container, .. } => vec![
                format!("Inspect the container: lxc exec {container} -- ip addr"),
                format!("Remove it when done: lxc stop -f {container}"),
                "If a detach warning was logged, remove the leftover snapcraft-remote-* entry shown by `lxc remote list`".to_string(),
                "Increase --network-timeout if the image server is slow".to_string(),
            ],
            Self::BuildExecution { .. } => {
                vec!["Run `snapcraft` locally to reproduce the build failure".to_string()]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
