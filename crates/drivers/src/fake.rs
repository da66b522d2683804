// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake driver for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{AgentDriver, DriverError, DriverEvent, RunOptions};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

/// What one scripted `run` call does.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRun {
    pub events: Vec<DriverEvent>,
    pub final_text: String,
    pub error: Option<String>,
}

impl ScriptedRun {
    /// A run that announces a native session id and streams one chunk.
    pub fn streaming(native_id: &str, chunks: &[&str]) -> Self {
        let mut events = vec![DriverEvent::NativeSessionId(native_id.to_string())];
        events.extend(chunks.iter().map(|c| DriverEvent::Chunk(c.to_string())));
        Self {
            events,
            final_text: chunks.concat(),
            error: None,
        }
    }

    /// A run that returns text without streaming chunks.
    pub fn text(final_text: &str) -> Self {
        Self {
            final_text: final_text.to_string(),
            ..Self::default()
        }
    }

    /// A run that fails.
    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }
}

struct FakeDriverState {
    script: VecDeque<ScriptedRun>,
    calls: Vec<RunOptions>,
}

/// Scripted driver: plays back queued [`ScriptedRun`]s and records every
/// [`RunOptions`] it was called with. An exhausted script replays an empty
/// successful run.
#[derive(Clone)]
pub struct FakeDriver {
    name: String,
    inner: Arc<Mutex<FakeDriverState>>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::named("claude")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: Arc::new(Mutex::new(FakeDriverState {
                script: VecDeque::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Queue the next scripted run.
    pub fn push_run(&self, run: ScriptedRun) {
        self.inner.lock().script.push_back(run);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<RunOptions> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }
}

#[async_trait]
impl AgentDriver for FakeDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        opts: RunOptions,
        events: mpsc::UnboundedSender<DriverEvent>,
    ) -> Result<String, DriverError> {
        let scripted = {
            let mut inner = self.inner.lock();
            inner.calls.push(opts);
            inner.script.pop_front().unwrap_or_default()
        };
        for event in scripted.events {
            let _ = events.send(event);
        }
        match scripted.error {
            Some(message) => Err(DriverError::Other(message)),
            None => Ok(scripted.final_text),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
