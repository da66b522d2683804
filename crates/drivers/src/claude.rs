// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference driver for the Claude Code CLI's line-delimited JSON stream.

use crate::{AgentDriver, DriverError, DriverEvent, RunOptions};
use async_trait::async_trait;
use gantry_core::{ApprovalMode, ModelTier};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncBufReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;

/// Lines beyond this are skipped rather than parsed.
const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// One line of the backend's stdout stream. Unknown `type` values and
/// extra fields are ignored.
#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

fn parse_stream_line(line: &[u8]) -> Option<StreamLine> {
    serde_json::from_slice(line).ok()
}

/// Driver for a Claude Code style CLI.
///
/// Spawns `<bin>` with stream-JSON output in the session's anchor
/// directory, resumes the backend-native session when one is cached, and
/// maps approval mode and model tier to backend flags. Stderr goes to the
/// shared diagnostics log.
pub struct ClaudeDriver {
    bin: String,
    tier_models: HashMap<ModelTier, String>,
    log_path: PathBuf,
}

impl ClaudeDriver {
    pub fn new(
        bin: impl Into<String>,
        tier_models: HashMap<ModelTier, String>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bin: bin.into(),
            tier_models,
            log_path: log_path.into(),
        }
    }

    fn build_args(&self, opts: &RunOptions) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            opts.prompt.clone(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];
        if let Some(id) = opts.native_session_id.as_deref().filter(|id| !id.is_empty()) {
            args.push("--resume".to_string());
            args.push(id.to_string());
        }
        if opts.yolo || opts.approval == ApprovalMode::Yolo {
            args.push("--dangerously-skip-permissions".to_string());
        } else {
            args.push("--permission-mode".to_string());
            args.push(
                match opts.approval {
                    ApprovalMode::Plan => "plan",
                    ApprovalMode::AutoEdit => "acceptEdits",
                    ApprovalMode::Yolo => "bypassPermissions",
                }
                .to_string(),
            );
        }
        if let Some(model) = opts.model_tier.and_then(|t| self.tier_models.get(&t)) {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if opts.budget_usd > 0.0 {
            // The backend has no budget flag; the cap is advisory here.
            tracing::debug!(budget_usd = opts.budget_usd, "budget cap not mapped for this backend");
        }
        args
    }

    fn stderr_log(&self) -> Stdio {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
        {
            Ok(file) => Stdio::from(file),
            Err(err) => {
                tracing::warn!(path = %self.log_path.display(), error = %err, "cannot open agent diagnostics log");
                Stdio::null()
            }
        }
    }
}

#[async_trait]
impl AgentDriver for ClaudeDriver {
    fn name(&self) -> &str {
        "claude"
    }

    async fn run(
        &self,
        opts: RunOptions,
        events: mpsc::UnboundedSender<DriverEvent>,
    ) -> Result<String, DriverError> {
        let args = self.build_args(&opts);
        tracing::debug!(bin = %self.bin, cwd = %opts.cwd.display(), "spawning agent subprocess");

        let mut child = Command::new(&self.bin)
            .args(&args)
            .current_dir(&opts.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(self.stderr_log())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DriverError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::Other("agent stdout not captured".to_string()))?;
        let mut reader = tokio::io::BufReader::new(stdout);
        let mut line = Vec::new();
        let mut accumulated = String::new();

        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line).await?;
            if n == 0 {
                break;
            }
            if line.len() > MAX_LINE_BYTES {
                tracing::warn!(bytes = line.len(), "skipping oversized agent output line");
                continue;
            }
            let Some(parsed) = parse_stream_line(&line) else {
                // Non-JSON noise on stdout is tolerated.
                continue;
            };
            match parsed.kind.as_str() {
                "init" => {
                    if let Some(id) = parsed.session_id.filter(|id| !id.is_empty()) {
                        let _ = events.send(DriverEvent::NativeSessionId(id));
                    }
                }
                "message" => {
                    if let Some(content) = parsed.content.filter(|c| !c.is_empty()) {
                        accumulated.push_str(&content);
                        let _ = events.send(DriverEvent::Chunk(content));
                    }
                }
                _ => {}
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(DriverError::AgentExit {
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(accumulated)
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
