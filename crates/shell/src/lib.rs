// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shell command execution for skill states.
//!
//! Commands run through `sh -c` with the session's anchor directory as the
//! working directory. Execution is bounded by a wall-clock timeout
//! (timeout yields exit code 124, matching coreutils `timeout`), and the
//! combined stdout+stderr is capped: when output exceeds the cap, the
//! middle is elided so compiler diagnostics at the head and assertion
//! failures at the tail both survive.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Wall-clock limit per command.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit code reported when the timeout elapses.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Cap on captured combined output.
pub const OUTPUT_CAP_BYTES: usize = 32 * 1024;

/// Bytes of the head preserved when eliding.
pub const HEAD_KEEP_BYTES: usize = 1024;

/// Errors spawning a command. Non-zero exits are not errors; they are
/// reported through [`ShellOutput::exit_code`].
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

/// Result of one shell command.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub exit_code: i32,
    /// Combined stdout+stderr, possibly elided in the middle
    pub output: String,
    pub truncated: bool,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs commands via `sh -c` with a timeout and output cap.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    cwd: Option<PathBuf>,
    timeout: Duration,
    output_cap: usize,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            cwd: None,
            timeout: COMMAND_TIMEOUT,
            output_cap: OUTPUT_CAP_BYTES,
        }
    }

    /// Set the working directory for spawned commands.
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }

    /// Override the wall-clock timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the output cap.
    pub fn output_cap(mut self, bytes: usize) -> Self {
        self.output_cap = bytes;
        self
    }

    /// Run one command to completion.
    pub async fn run(&self, command: &str) -> Result<ShellOutput, ExecError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        tracing::debug!(command, cwd = ?self.cwd, "running shell command");

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(out)) => {
                let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&out.stderr));
                let (output, truncated) =
                    elide_middle(&combined, self.output_cap, HEAD_KEEP_BYTES);
                let exit_code = out.status.code().unwrap_or(-1);
                if exit_code != 0 {
                    tracing::debug!(command, exit_code, "shell command failed");
                }
                Ok(ShellOutput {
                    exit_code,
                    output,
                    truncated,
                })
            }
            Ok(Err(source)) => Err(ExecError::Spawn {
                command: command.to_string(),
                source,
            }),
            Err(_elapsed) => {
                tracing::warn!(command, timeout_s = self.timeout.as_secs(), "shell command timed out");
                Ok(ShellOutput {
                    exit_code: TIMEOUT_EXIT_CODE,
                    output: format!(
                        "command timed out after {}s",
                        self.timeout.as_secs()
                    ),
                    truncated: false,
                })
            }
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Elide the middle of `s` when it exceeds `cap` bytes, keeping
/// `head_keep` bytes of the head and the remainder of the budget as tail.
fn elide_middle(s: &str, cap: usize, head_keep: usize) -> (String, bool) {
    if s.len() <= cap {
        return (s.to_string(), false);
    }
    let head_keep = head_keep.min(cap);
    let tail_keep = cap - head_keep;

    let head_end = floor_char_boundary(s, head_keep);
    let tail_start = ceil_char_boundary(s, s.len() - tail_keep);
    let elided = tail_start - head_end;

    let out = format!(
        "{}\n...[{} bytes elided]...\n{}",
        &s[..head_end],
        elided,
        &s[tail_start..]
    );
    (out, true)
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
