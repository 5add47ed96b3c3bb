//! Shell command execution with bounded capture and an optional timeout.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::core::chdir::{chdir_target, resolve_target};
use crate::core::types::ExecutionOutcome;

/// The working directory was missing or unreadable at execution time.
///
/// Fatal to the current call only; the loop surfaces it and continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentError {
    pub workdir: PathBuf,
}

impl fmt::Display for EnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "working directory is not accessible: {}",
            self.workdir.display()
        )
    }
}

impl std::error::Error for EnvironmentError {}

/// Abstraction over command execution backends.
///
/// Tests use scripted runners that return predetermined outcomes without
/// spawning processes.
pub trait CommandRunner {
    /// Execute `command` with `cwd` as the working directory.
    fn run(&self, command: &str, cwd: &Path) -> Result<ExecutionOutcome>;
}

/// Runner that executes through `sh -c`, so pipes, globs, and `&&` behave
/// as they would for a human at a prompt.
///
/// stdout and stderr are captured separately; the exit code is the shell's.
/// A command that is not found is a normal non-zero outcome, not an error.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    /// `None` waits indefinitely (the default behavior).
    pub timeout: Option<Duration>,
    /// Bound on captured bytes per stream.
    pub output_limit_bytes: usize,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            timeout: None,
            output_limit_bytes: 100_000,
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<ExecutionOutcome> {
        if command.trim().is_empty() {
            return Err(anyhow!("command must be non-empty"));
        }
        if !cwd.is_dir() {
            return Err(EnvironmentError {
                workdir: cwd.to_path_buf(),
            }
            .into());
        }

        // Directory changes never spawn: the subprocess's cwd would be lost
        // at exit. Resolve the target and report it for the session to apply.
        if let Some(target) = chdir_target(command) {
            let home = std::env::var_os("HOME").map(PathBuf::from);
            let resolved = resolve_target(cwd, target, home.as_deref());
            debug!(cd_target = target, resolved = %resolved.display(), "directory change requested");
            return Ok(ExecutionOutcome {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                executed: true,
                new_workdir: Some(resolved),
            });
        }

        debug!(command, cwd = %cwd.display(), "spawning shell command");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("spawn shell")?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;

        let limit = self.output_limit_bytes;
        let stdout_handle = thread::spawn(move || read_stream_limited(stdout, limit));
        let stderr_handle = thread::spawn(move || read_stream_limited(stderr, limit));

        let mut timed_out = false;
        let status = match self.timeout {
            None => child.wait().context("wait for command")?,
            Some(timeout) => match child.wait_timeout(timeout).context("wait for command")? {
                Some(status) => status,
                None => {
                    warn!(
                        timeout_secs = timeout.as_secs(),
                        "command timed out, killing"
                    );
                    timed_out = true;
                    child.kill().context("kill command")?;
                    child.wait().context("wait command after kill")?
                }
            },
        };

        let (stdout_raw, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
        let (stderr_raw, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

        let stdout_text = String::from_utf8_lossy(&stdout_raw).into_owned();
        let mut stderr_text = String::from_utf8_lossy(&stderr_raw).into_owned();
        if stdout_truncated > 0 {
            warn!(stdout_truncated, "stdout truncated");
            stderr_text.push_str(&format!("\n[stdout truncated {stdout_truncated} bytes]\n"));
        }
        if stderr_truncated > 0 {
            warn!(stderr_truncated, "stderr truncated");
            stderr_text.push_str(&format!("\n[stderr truncated {stderr_truncated} bytes]\n"));
        }
        if timed_out {
            let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
            stderr_text.push_str(&format!("\n[command timed out after {secs}s]\n"));
        }

        let exit_code = status.code().unwrap_or(-1);
        debug!(exit_code, timed_out, "command finished");
        Ok(ExecutionOutcome {
            exit_code,
            stdout: stdout_text,
            stderr: stderr_text,
            executed: true,
            new_workdir: None,
        })
    }
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Read a stream to EOF, keeping at most `limit` bytes and counting the
/// rest. The pipe is always drained so the child never blocks on a full
/// buffer.
fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
