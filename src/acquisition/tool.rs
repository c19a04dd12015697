//! Scoped execution of external tools (yt-dlp, ffmpeg)

use crate::error::AcquisitionError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// How much trailing stderr is kept in a failure reason
const STDERR_TAIL_CHARS: usize = 600;

/// Captured output of a successful tool invocation
#[derive(Clone, Debug, Default)]
pub struct ToolOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

/// Runs one external binary
///
/// The child process is spawned with `kill_on_drop`, so a timeout or a
/// cancelled caller kills it; tokio reaps it in the background. Output is
/// always captured and the tail of stderr ends up in the failure reason.
#[derive(Clone, Debug)]
pub struct ToolRunner {
    name: &'static str,
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ToolRunner {
    /// Create a runner for `program`, reported as `name` in errors
    pub fn new(name: &'static str, program: impl Into<PathBuf>) -> Self {
        Self {
            name,
            program: program.into(),
            timeout: None,
        }
    }

    /// Bound every invocation by `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tool name used in errors and logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Binary being executed
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the tool to completion
    ///
    /// Fails with [`AcquisitionError::ToolInvocationFailed`] when the binary
    /// cannot be spawned, exits non-zero, or exceeds the timeout.
    pub async fn run<I, S>(&self, args: I) -> Result<ToolOutput, AcquisitionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(tool = self.name, program = %self.program.display(), "running tool");

        let child = command.spawn().map_err(|e| {
            AcquisitionError::tool(
                self.name,
                format!("failed to execute {}: {}", self.program.display(), e),
            )
        })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                // Dropping the wait future drops the child, which kills it
                Err(_) => {
                    return Err(AcquisitionError::tool(
                        self.name,
                        format!("timed out after {}s", limit.as_secs_f64()),
                    ));
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| {
            AcquisitionError::tool(self.name, format!("failed to wait for process: {}", e))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(AcquisitionError::tool(
                self.name,
                format!("{}: {}", output.status, stderr_tail(&stderr)),
            ));
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - STDERR_TAIL_CHARS).collect();
    format!("...{tail}")
}
