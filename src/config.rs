//! Clean-build configuration and defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Image server registered as a temporary LXD remote.
pub const DEFAULT_IMAGE_SERVER: &str = "https://images.linuxcontainers.org/";

/// Image release launched for the build (`<release>/<arch>` on the image server).
pub const DEFAULT_RELEASE: &str = "ubuntu/xenial";

/// Default delay between network reachability probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default bound on the network wait (five probes at the default interval)
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(25);

/// Bounded polling parameters for the network-readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkWait {
    /// Delay between two probes
    pub poll_interval: Duration,
    /// Total time allowed before giving up
    pub timeout: Duration,
}

impl Default for NetworkWait {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }
}

/// Launch options for the LXD build container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LxdOptions {
    /// Image server URL
    pub image_server: String,
    /// Image release, e.g. `ubuntu/xenial`
    pub release: String,
    /// Leave the container running after a successful or failed build
    pub keep_container: bool,
}

impl Default for LxdOptions {
    fn default() -> Self {
        Self {
            image_server: DEFAULT_IMAGE_SERVER.to_string(),
            release: DEFAULT_RELEASE.to_string(),
            keep_container: false,
        }
    }
}

/// Configuration for one clean-build invocation
#[derive(Debug, Clone)]
pub struct CleanBuildConfig {
    /// Project root containing snapcraft.yaml
    pub project_dir: PathBuf,
    /// Network wait bounds
    pub network: NetworkWait,
    /// Container launch options
    pub lxd: LxdOptions,
}

impl CleanBuildConfig {
    /// Configuration with defaults for the given project directory
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            network: NetworkWait::default(),
            lxd: LxdOptions::default(),
        }
    }

    /// Replace the network wait bounds
    pub fn with_network(mut self, network: NetworkWait) -> Self {
        self.network = network;
        self
    }
}

impl Default for CleanBuildConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
