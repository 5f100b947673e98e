//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap,
//! with validation and conversion into a [`CleanBuildConfig`].

use crate::config::{CleanBuildConfig, DEFAULT_IMAGE_SERVER, DEFAULT_RELEASE, LxdOptions, NetworkWait};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Clean build of a snap inside an ephemeral LXD container
#[derive(Parser, Debug)]
#[command(
    name = "cleanbuild",
    version,
    about = "Build a snap inside a clean LXD container",
    long_about = "Packs the project's sources (without parts/, stage/, snap/ build residue) into
<name>_<version>_source.tar.bz2, builds it with snapcraft inside a fresh LXD container,
and retrieves <name>_<version>_<arch>.snap into the project directory.

Usage:
  cleanbuild
  cleanbuild --project-dir ~/src/my-snap --network-timeout 60

Exit code 0 = artifact guaranteed to exist in the project directory."
)]
pub struct Args {
    /// Project directory containing snapcraft.yaml
    #[arg(short = 'd', long, value_name = "DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Image server registered as a temporary LXD remote
    #[arg(long, value_name = "URL", env = "CLEANBUILD_IMAGE_SERVER", default_value = DEFAULT_IMAGE_SERVER)]
    pub image_server: String,

    /// Image release to launch, without architecture
    #[arg(long, value_name = "RELEASE", default_value = DEFAULT_RELEASE)]
    pub release: String,

    /// Seconds to wait for the container's network before giving up
    #[arg(long, value_name = "SECS", default_value_t = 25)]
    pub network_timeout: u64,

    /// Seconds between network reachability probes
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub poll_interval: u64,

    /// Leave the container running after the build
    #[arg(long)]
    pub keep_container: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval == 0 {
            return Err("--poll-interval must be at least 1 second".to_string());
        }

        if self.network_timeout < self.poll_interval {
            return Err(format!(
                "--network-timeout ({}s) must not be shorter than --poll-interval ({}s)",
                self.network_timeout, self.poll_interval
            ));
        }

        if !self.project_dir.is_dir() {
            return Err(format!(
                "Project directory does not exist: {}",
                self.project_dir.display()
            ));
        }

        if self.release.is_empty() || self.image_server.is_empty() {
            return Err("--release and --image-server cannot be empty".to_string());
        }

        Ok(())
    }
}

impl From<&Args> for CleanBuildConfig {
    fn from(args: &Args) -> Self {
        Self {
            project_dir: args.project_dir.clone(),
            network: NetworkWait {
                poll_interval: Duration::from_secs(args.poll_interval),
                timeout: Duration::from_secs(args.network_timeout),
            },
            lxd: LxdOptions {
                image_server: args.image_server.clone(),
                release: args.release.clone(),
                keep_container: args.keep_container,
            },
        }
    }
}
