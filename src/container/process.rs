//! Bounded command execution with output capture.

use super::RuntimeError;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Result of a finished command
#[derive(Debug)]
pub struct CommandOutput {
    /// Exit status of the command
    pub status: ExitStatus,
    /// Captured stdout lines
    pub stdout_lines: Vec<String>,
    /// Captured stderr lines
    pub stderr_lines: Vec<String>,
}

impl CommandOutput {
    /// Exit code, `-1` when the process was killed by a signal
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// stdout followed by stderr
    pub fn combined_lines(&self) -> Vec<String> {
        self.stdout_lines
            .iter()
            .chain(self.stderr_lines.iter())
            .cloned()
            .collect()
    }
}

/// Runs `program args...`, streaming stdout to the debug log, bounded by `limit`.
///
/// A command that outlives `limit` is killed and reported as an error.
pub async fn run_command(
    program: &str,
    args: &[String],
    limit: Duration,
) -> Result<CommandOutput, RuntimeError> {
    let display = format!("{} {}", program, args.join(" "));
    log::debug!("Running: {}", display);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RuntimeError::new(&display, e.to_string()))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // Both streams must complete before we check exit status
    let collect = async {
        let (stdout_lines, stderr_lines) =
            tokio::join!(read_lines(stdout, true), read_lines(stderr, false));
        let status = child.wait().await;
        (stdout_lines, stderr_lines, status)
    };

    let outcome = tokio::time::timeout(limit, collect).await;
    let (stdout_lines, stderr_lines, status) = match outcome {
        Ok((stdout_lines, stderr_lines, Ok(status))) => (stdout_lines, stderr_lines, status),
        Ok((_, _, Err(e))) => return Err(RuntimeError::new(&display, e.to_string())),
        Err(_elapsed) => {
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill {}: {}", program, e);
            }
            return Err(RuntimeError::new(
                &display,
                format!("timed out after {} seconds", limit.as_secs()),
            ));
        }
    };

    Ok(CommandOutput {
        status,
        stdout_lines,
        stderr_lines,
    })
}

async fn read_lines<R>(stream: Option<R>, echo: bool) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Vec::new();
    if let Some(stream) = stream {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if echo {
                log::debug!("  {}", line);
            }
            captured.push(line);
        }
    }
    captured
}
