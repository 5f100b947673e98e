//! Host precondition checks.
//!
//! A clean build needs the LXD runtime on the host. [`check`] runs before anything is
//! written to disk or launched, so a missing runtime never leaves partial state behind.

use crate::container::run_command;
use std::time::Duration;
use thiserror::Error;

/// Distribution package providing the container runtime
pub const RUNTIME_PACKAGE: &str = "lxd";

/// Client binary of the container runtime
pub const RUNTIME_CLIENT: &str = "lxc";

/// Container runtime is not installed.
///
/// The message is a support-facing instruction and must stay stable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "The {package} package is not installed, in order to use `cleanbuild` you must install {package} onto your system. Refer to the \"Ubuntu Desktop and Ubuntu Server\" section on https://linuxcontainers.org/lxd/getting-started-cli/#ubuntu-desktop-and-ubuntu-server to enable a proper setup."
)]
pub struct DependencyError {
    package: String,
}

impl DependencyError {
    /// Error for the given missing package
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }

    /// Name of the missing package
    pub fn package(&self) -> &str {
        &self.package
    }
}

/// Bound for one package database query
const PACKAGE_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Answers whether the container runtime package is installed.
#[allow(async_fn_in_trait)]
pub trait DependencyProbe {
    /// `true` when the runtime package is present on the host
    async fn is_runtime_package_installed(&self) -> bool;
}

impl<F> DependencyProbe for F
where
    F: Fn() -> bool,
{
    async fn is_runtime_package_installed(&self) -> bool {
        self()
    }
}

/// Probe backed by the host's package database.
///
/// Asks `dpkg-query` for the package status. Hosts without dpkg, or where the query
/// does not answer in time, fall back to looking for the runtime client on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    package: String,
    client: String,
}

impl SystemProbe {
    /// Probe for a specific package and client binary
    pub fn new(package: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            client: client.into(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new(RUNTIME_PACKAGE, RUNTIME_CLIENT)
    }
}

impl DependencyProbe for SystemProbe {
    async fn is_runtime_package_installed(&self) -> bool {
        let args = vec![
            "-W".to_string(),
            "-f=${Status}".to_string(),
            self.package.clone(),
        ];
        match run_command("dpkg-query", &args, PACKAGE_QUERY_TIMEOUT).await {
            Ok(output) => {
                let status = output.stdout_lines.join(" ");
                log::debug!("dpkg-query status for {}: {:?}", self.package, status.trim());
                output.status.success() && status.trim() == "install ok installed"
            }
            Err(e) => {
                log::debug!("{}; looking for {} on PATH", e, self.client);
                match which::which(&self.client) {
                    Ok(path) => {
                        log::debug!("Found {} at: {}", self.client, path.display());
                        true
                    }
                    Err(_) => false,
                }
            }
        }
    }
}

/// Fails with [`DependencyError`] when the runtime package is missing.
pub async fn check<P: DependencyProbe + ?Sized>(probe: &P) -> Result<(), DependencyError> {
    if probe.is_runtime_package_installed().await {
        Ok(())
    } else {
        Err(DependencyError::new(RUNTIME_PACKAGE))
    }
}
