//! Clean-build library for snap packages.
//!
//! This library performs an isolated build of a snapcraft project:
//! - verifies the LXD container runtime is installed
//! - packs the project's source tree (minus host build residue) into a `.tar.bz2` snapshot
//! - drives an ephemeral container through setup, network wait, build and retrieval
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod checksum;
pub mod cleanbuild;
pub mod cli;
pub mod config;
pub mod container;
pub mod error;
pub mod lifecycle;
pub mod preflight;
pub mod project;
pub mod snapshot;

// Re-export commonly used types
pub use cleanbuild::{CleanBuildOutcome, clean_build};
pub use config::{CleanBuildConfig, NetworkWait};
pub use error::{CleanBuildError, CliError, Result};
