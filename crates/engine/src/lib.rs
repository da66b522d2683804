// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Skill Engine: interprets skill state graphs, drives agent
//! subprocesses through verify-edit cycles, enforces retry and loop
//! budgets, and escalates to human intervention when budgets run out.

pub mod cot;
mod engine;
pub mod heartbeat;
pub mod intervention;
pub mod prompt;
mod running;

pub use cot::{CotParser, Segment};
pub use engine::Engine;
pub use heartbeat::{load_heartbeats, parse_interval, HeartbeatDef, HeartbeatRunner};
pub use intervention::InterventionAction;
pub use prompt::{build_prompt, RESUME_SENTINEL};

use gantry_drivers::DriverError;
use gantry_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by engine entry points.
///
/// Transient subprocess failures (non-zero verifies, recoverable driver
/// errors) are not errors here; they feed the retry/loop machinery.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session is already running: {0}")]
    Busy(Uuid),
    #[error("no driver registered for backend '{0}'")]
    UnknownDriver(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}
