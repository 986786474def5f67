//! External tool invocation.
//!
//! Each check runs exactly one child process with captured output. The
//! program and arguments are passed straight to the OS with no shell in
//! between, so validated absolute paths cannot be reinterpreted.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;

use crate::godot::error::{CheckError, CheckResult};

/// Per-stream capture limit. gdlint output for a large project stays well
/// under this; a runaway export log gets truncated instead of ballooning.
const MAX_CAPTURE_BYTES: usize = 10 * 1024 * 1024;

/// Marker appended when a stream exceeded [`MAX_CAPTURE_BYTES`].
const TRUNCATION_MARKER: &str = "\n... [output truncated]";

/// Captured outcome of one external tool run.
///
/// A nonzero exit code is not an error at this level: callers decide what
/// failure means by combining the exit code with an output scan.
#[derive(Debug)]
pub struct CommandOutput {
    /// Process exit code; `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output (lossy UTF-8, possibly truncated).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8, possibly truncated).
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Options for [`run_command`].
#[derive(Debug, Default)]
pub struct RunOptions<'a> {
    /// Working directory for the child process.
    pub cwd: Option<&'a Path>,
    /// Kill the child and fail with [`CheckError::Timeout`] after this long.
    pub timeout: Option<Duration>,
}

/// Runs one external command and captures its output.
///
/// stdout and stderr are drained concurrently while waiting for the child,
/// so a process that fills one pipe before closing the other cannot
/// deadlock. Each stream is truncated at 10 MiB.
///
/// # Errors
///
/// - [`CheckError::Spawn`] if the binary cannot be launched
/// - [`CheckError::Timeout`] if the bound expires (the child is killed)
pub async fn run_command<I, S>(
    program: &str,
    args: I,
    options: RunOptions<'_>,
) -> CheckResult<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = options.cwd {
        cmd.current_dir(cwd);
    }

    tracing::debug!(program, "running external tool");

    let mut child = cmd.spawn().map_err(|e| CheckError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let wait_all = async {
        let (stdout_buf, stderr_buf, status) = tokio::join!(
            read_capped(stdout),
            read_capped(stderr),
            child.wait(),
        );
        (status, stdout_buf, stderr_buf)
    };

    let outcome = match options.timeout {
        Some(bound) => timeout(bound, wait_all).await,
        None => Ok(wait_all.await),
    };

    let (status, stdout_buf, stderr_buf) = match outcome {
        Ok(done) => done,
        Err(_) => {
            let _ = child.kill().await;
            return Err(CheckError::Timeout {
                seconds: options.timeout.unwrap_or_default().as_secs(),
            });
        }
    };

    let status = status.map_err(|e| CheckError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    Ok(CommandOutput {
        exit_code: status.code(),
        stdout: stdout_buf,
        stderr: stderr_buf,
    })
}

/// Reads a child stream to the capture limit, marking truncation.
async fn read_capped<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let Some(stream) = stream else {
        return String::new();
    };

    let mut buf = Vec::new();
    let mut limited = stream.take(MAX_CAPTURE_BYTES as u64 + 1);
    // A broken pipe mid-read still leaves the prefix usable.
    let _ = limited.read_to_end(&mut buf).await;

    let truncated = buf.len() > MAX_CAPTURE_BYTES;
    if truncated {
        buf.truncate(MAX_CAPTURE_BYTES);
    }

    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}
