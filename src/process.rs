//! External tool invocation
//!
//! Runs command-line tools (yt-dlp) with captured output and an optional
//! wall-clock limit. Output pipes are drained on background threads so a
//! chatty tool cannot block on a full pipe while we wait for it.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors that can occur while running an external tool
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to start {program}: {source}")]
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed while waiting for {program}: {source}")]
    WaitFailed {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} did not finish within {} seconds", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}

/// Captured result of a finished tool run
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Checks if a tool is installed by running it with a version flag
pub fn is_installed(program: &str, version_arg: &str) -> bool {
    Command::new(program)
        .arg(version_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_end(&mut buffer);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Duration,
) -> Result<ExitStatus, ProcessError> {
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProcessError::TimedOut {
                    program: program.to_string(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(ProcessError::WaitFailed {
                    program: program.to_string(),
                    source: e,
                });
            }
        }
    }
}

/// Runs a tool to completion and captures its output
///
/// A non-zero exit status is not an error here; callers inspect
/// [`ToolOutput::success`]. With a timeout, the process is killed once the
/// limit is exceeded.
pub fn run_tool(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<ToolOutput, ProcessError> {
    debug!(program, ?args, "running external tool");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ProcessError::SpawnFailed {
            program: program.to_string(),
            source: e,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match timeout {
        Some(limit) => wait_with_deadline(&mut child, program, limit),
        None => child.wait().map_err(|e| ProcessError::WaitFailed {
            program: program.to_string(),
            source: e,
        }),
    };

    // After a timeout, orphaned grandchildren may still hold the pipes open,
    // so the readers are left detached instead of joined
    let status = status?;

    Ok(ToolOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

/// Shortens tool output for one-line error messages
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    let trimmed = message.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_captures_output() {
        let output = run_tool("sh", &sh("echo out; echo err >&2"), None).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_non_zero_exit_is_not_an_error() {
        let output = run_tool("sh", &sh("exit 3"), None).unwrap();
        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let result = run_tool("sh", &sh("sleep 5"), Some(Duration::from_millis(200)));
        assert!(matches!(result, Err(ProcessError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_with_lingering_grandchild() {
        let started = Instant::now();
        let result = run_tool(
            "sh",
            &sh("sleep 4; true"),
            Some(Duration::from_millis(200)),
        );
        assert!(matches!(result, Err(ProcessError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_missing_program() {
        let result = run_tool("definitely-not-an-installed-tool", &[], None);
        assert!(matches!(result, Err(ProcessError::SpawnFailed { .. })));
        assert!(!is_installed("definitely-not-an-installed-tool", "--version"));
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("  short  ", 10), "short");
        assert_eq!(truncate_message("abcdef", 3), "abc...");
        assert_eq!(truncate_message("äöüß", 2), "äö...");
    }
}
