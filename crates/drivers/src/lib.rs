// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Agent drivers: each driver abstracts one external coding-agent
//! subprocess behind a uniform run contract.
//!
//! A driver spawns the backend binary in the session's anchor directory,
//! parses its line-delimited JSON stdout, and reports progress through a
//! channel: the backend's native session id as soon as it is known, and
//! each streamed content chunk. The engine consumes the channel while the
//! run future is in flight and must not block between receives.

mod claude;
pub mod registry;

pub use claude::ClaudeDriver;
pub use registry::DriverRegistry;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeDriver, ScriptedRun};

use async_trait::async_trait;
use gantry_core::{ApprovalMode, ModelTier};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from driver runs.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to spawn agent `{bin}`: {source}")]
    Spawn {
        bin: String,
        source: std::io::Error,
    },
    #[error("agent i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("agent exited with code {code}")]
    AgentExit { code: i32 },
    #[error("{0}")]
    Other(String),
}

/// What the engine supplies for one agent turn.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Backend-native session id; `None` on the first turn of a role
    pub native_session_id: Option<String>,
    pub prompt: String,
    /// Working directory for the subprocess (the session's anchor)
    pub cwd: PathBuf,
    pub approval: ApprovalMode,
    /// Unrestricted mode, redundant with `approval == Yolo` but kept
    /// explicit so drivers need no policy knowledge
    pub yolo: bool,
    pub model_tier: Option<ModelTier>,
    /// Monetary cap in USD; 0 means unlimited
    pub budget_usd: f64,
}

/// Progress reported by a driver while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// The backend issued (or confirmed) its native session id
    NativeSessionId(String),
    /// One streamed content chunk
    Chunk(String),
}

/// One external agent backend.
#[async_trait]
pub trait AgentDriver: Send + Sync + 'static {
    /// Registry key and default backend name (e.g. "claude").
    fn name(&self) -> &str;

    /// Execute one turn to completion.
    ///
    /// Sends [`DriverEvent`]s on `events` as the stream is parsed; the
    /// sender is dropped when the subprocess exits. Returns the full
    /// concatenated content, or the process's exit error.
    async fn run(
        &self,
        opts: RunOptions,
        events: mpsc::UnboundedSender<DriverEvent>,
    ) -> Result<String, DriverError>;
}
