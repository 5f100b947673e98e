//! LXD-backed container runtime.
//!
//! Each runtime registers a temporary image remote, launches one ephemeral container
//! from it and drives the build through `lxc exec`.

use super::process::{CommandOutput, run_command};
use super::{BuildOutcome, ContainerRuntime, RuntimeError};
use crate::config::LxdOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Runtime client binary
const LXC: &str = "lxc";

/// Bound for quick client calls (remotes, file transfer, stop)
const LXC_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Bound for `lxc launch`, which may download the image
const LXC_LAUNCH_TIMEOUT: Duration = Duration::from_secs(900);

/// Bound for each build step (apt and snapcraft)
const LXC_BUILD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Bound for one reachability probe
const NETWORK_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Page fetched from inside the container to prove connectivity
const CONNECTIVITY_CHECK_URL: &str = "http://start.ubuntu.com/connectivity-check.html";

/// Runtime for one ephemeral LXD container.
#[derive(Debug)]
pub struct LxdRuntime {
    container_name: String,
    remote_name: String,
    image: String,
    options: LxdOptions,
}

impl LxdRuntime {
    /// Runtime for a fresh container of the given architecture
    pub fn new(options: LxdOptions, arch: &str) -> Self {
        let build_id = Uuid::new_v4().simple().to_string();
        let container_name = format!("snapcraft-{}", &build_id[..12]);
        let remote_name = format!("snapcraft-remote-{}", &build_id[12..20]);
        let image = format!("{}:{}/{}", remote_name, options.release, arch);
        Self {
            container_name,
            remote_name,
            image,
            options,
        }
    }

    /// Image reference passed to `lxc launch`
    pub fn image(&self) -> &str {
        &self.image
    }

    async fn lxc(&self, args: Vec<String>, limit: Duration) -> Result<CommandOutput, RuntimeError> {
        run_command(LXC, &args, limit).await
    }

    /// Run an `lxc` command and fail on nonzero exit.
    async fn lxc_checked(&self, args: Vec<String>, limit: Duration) -> Result<(), RuntimeError> {
        let command = format!("{} {}", LXC, args.join(" "));
        let output = self.lxc(args, limit).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(RuntimeError::new(
                command,
                format!(
                    "exit code {}: {}",
                    output.exit_code(),
                    output.stderr_lines.join("\n")
                ),
            ))
        }
    }

    /// `lxc exec <container> [--cwd dir] -- <cmd...>`
    fn exec_args(&self, cwd: Option<&str>, cmd: &[&str]) -> Vec<String> {
        let mut args = vec!["exec".to_string(), self.container_name.clone()];
        if let Some(cwd) = cwd {
            args.push("--cwd".to_string());
            args.push(cwd.to_string());
        }
        args.push("--".to_string());
        args.extend(cmd.iter().map(|s| s.to_string()));
        args
    }
}

impl ContainerRuntime for LxdRuntime {
    fn container_name(&self) -> &str {
        &self.container_name
    }

    async fn ensure_environment(&self) -> Result<(), RuntimeError> {
        self.lxc_checked(
            vec![
                "remote".to_string(),
                "add".to_string(),
                self.remote_name.clone(),
                self.options.image_server.clone(),
                "--accept-certificate".to_string(),
                "--public".to_string(),
            ],
            LXC_COMMAND_TIMEOUT,
        )
        .await?;

        self.lxc_checked(
            vec![
                "launch".to_string(),
                "-e".to_string(),
                self.image.clone(),
                self.container_name.clone(),
            ],
            LXC_LAUNCH_TIMEOUT,
        )
        .await?;

        log::debug!("Launched {} from {}", self.container_name, self.image);
        Ok(())
    }

    async fn push_path(&self, container_dir: &str, host_archive: &Path) -> Result<(), RuntimeError> {
        let archive_name = host_archive
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                RuntimeError::new(
                    "lxc file push",
                    format!("Archive path has no file name: {}", host_archive.display()),
                )
            })?;
        let container_archive = format!("{}/{}", container_dir.trim_end_matches('/'), archive_name);

        self.lxc_checked(
            vec![
                "file".to_string(),
                "push".to_string(),
                host_archive.display().to_string(),
                format!("{}{}", self.container_name, container_archive),
            ],
            LXC_COMMAND_TIMEOUT,
        )
        .await?;

        self.lxc_checked(
            self.exec_args(None, &["tar", "xvf", &container_archive, "-C", container_dir]),
            LXC_COMMAND_TIMEOUT,
        )
        .await
    }

    async fn is_network_ready(&self) -> bool {
        let script = format!(
            "import urllib.request; urllib.request.urlopen('{}', timeout=5)",
            CONNECTIVITY_CHECK_URL
        );
        match self
            .lxc(
                self.exec_args(None, &["python3", "-c", &script]),
                NETWORK_PROBE_TIMEOUT,
            )
            .await
        {
            Ok(output) => output.status.success(),
            Err(e) => {
                log::debug!("Network probe failed: {}", e);
                false
            }
        }
    }

    async fn exec_build(
        &self,
        container_dir: &str,
        artifact_name: &str,
    ) -> Result<BuildOutcome, RuntimeError> {
        let steps: [&[&str]; 3] = [
            &["apt-get", "update"],
            &["apt-get", "install", "snapcraft", "-y"],
            &["snapcraft", "snap", "--output", artifact_name],
        ];

        let mut output = Vec::new();
        for step in steps {
            let result = self
                .lxc(self.exec_args(Some(container_dir), step), LXC_BUILD_TIMEOUT)
                .await?;
            output.extend(result.combined_lines());
            if !result.status.success() {
                log::debug!("Build step `{}` exited {}", step.join(" "), result.exit_code());
                return Ok(BuildOutcome {
                    exit_code: result.exit_code(),
                    output,
                });
            }
        }

        Ok(BuildOutcome {
            exit_code: 0,
            output,
        })
    }

    async fn pull_artifact(
        &self,
        container_path: &str,
        host_dest: &Path,
    ) -> Result<PathBuf, RuntimeError> {
        self.lxc_checked(
            vec![
                "file".to_string(),
                "pull".to_string(),
                format!("{}{}", self.container_name, container_path),
                host_dest.display().to_string(),
            ],
            LXC_COMMAND_TIMEOUT,
        )
        .await?;

        if !tokio::fs::try_exists(host_dest).await.unwrap_or(false) {
            return Err(RuntimeError::new(
                "lxc file pull",
                format!("{} missing after pull", host_dest.display()),
            ));
        }
        Ok(host_dest.to_path_buf())
    }

    async fn detach(&self) -> Result<(), RuntimeError> {
        self.lxc_checked(
            vec![
                "remote".to_string(),
                "remove".to_string(),
                self.remote_name.clone(),
            ],
            LXC_COMMAND_TIMEOUT,
        )
        .await
    }

    async fn release(&self) -> Result<(), RuntimeError> {
        let stopped = if self.options.keep_container {
            log::info!("Leaving container {} running", self.container_name);
            Ok(())
        } else {
            // Ephemeral containers are deleted once stopped.
            self.lxc_checked(
                vec![
                    "stop".to_string(),
                    "-f".to_string(),
                    self.container_name.clone(),
                ],
                LXC_COMMAND_TIMEOUT,
            )
            .await
        };

        let detached = self.detach().await;
        stopped.and(detached)
    }
}
