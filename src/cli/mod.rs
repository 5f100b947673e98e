//! Command line interface for clean builds.
//!
//! Wires the host implementations (dpkg probe, LXD runtime, log reporter) into
//! [`crate::clean_build`].

mod args;

pub use args::Args;

use crate::cleanbuild::clean_build;
use crate::config::CleanBuildConfig;
use crate::container::LxdRuntime;
use crate::error::{CliError, Result};
use crate::lifecycle::LogReporter;
use crate::preflight::SystemProbe;
use crate::project::host_deb_arch;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let config = CleanBuildConfig::from(&args);
    let runtime = LxdRuntime::new(config.lxd.clone(), &host_deb_arch());

    let outcome = clean_build(&config, &SystemProbe::default(), &runtime, &LogReporter).await?;
    log::debug!(
        "Snapshot {} ({} member(s)), artifact {} sha256 {}",
        outcome.archive.path.display(),
        outcome.archive.entries.len(),
        outcome.artifact.display(),
        outcome.sha256
    );

    Ok(0)
}
