// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeats: periodic, headless engine invocations against pending
//! work. Each definition under `<root>/heartbeats/*.json` names an
//! interval, an anchor path, and the skills to run there.

use crate::{Engine, EngineError};
use gantry_core::{Event, Session, SessionStatus};
use gantry_skill::{SkillError, SkillLoader};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One heartbeat definition file.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatDef {
    pub name: String,
    /// Interval string such as `"90s"`, `"5m"`, `"2h"`
    pub interval: String,
    /// Anchor directory the heartbeat session is pinned to
    pub path: PathBuf,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Load every parseable `*.json` under `dir`, skipping the rest with a
/// warning. A missing directory is an empty set.
pub fn load_heartbeats(dir: &Path) -> Vec<HeartbeatDef> {
    let mut defs = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return defs,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|e| e != "json") {
            continue;
        }
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable heartbeat");
                continue;
            }
        };
        match serde_json::from_str::<HeartbeatDef>(&text) {
            Ok(def) => defs.push(def),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unparseable heartbeat");
            }
        }
    }
    defs.sort_by(|a, b| a.name.cmp(&b.name));
    defs
}

/// Parse an interval like `10s`, `5m`, `2h`, or `1d` (a bare number is
/// seconds).
pub fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty interval".to_string());
    }
    let (num_str, suffix) = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| (&s[..i], &s[i..]))
        .unwrap_or((s, ""));
    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in interval: {}", s))?;
    let secs = match suffix.trim() {
        "" | "s" | "sec" | "secs" => num,
        "m" | "min" | "mins" => num * 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => num * 3600,
        "d" | "day" | "days" => num * 86_400,
        other => return Err(format!("unknown interval suffix: {}", other)),
    };
    Ok(Duration::from_secs(secs))
}

/// Drives due heartbeats through the engine.
pub struct HeartbeatRunner {
    engine: Engine,
    loader: SkillLoader,
    default_agent: String,
    defs: Vec<HeartbeatDef>,
    last_fired: Mutex<HashMap<String, Instant>>,
}

impl HeartbeatRunner {
    pub fn new(
        engine: Engine,
        loader: SkillLoader,
        default_agent: impl Into<String>,
        defs: Vec<HeartbeatDef>,
    ) -> Self {
        Self {
            engine,
            loader,
            default_agent: default_agent.into(),
            defs,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Run every heartbeat that is due at `now`; returns how many fired.
    pub async fn run_due(&self, now: Instant) -> usize {
        let mut fired = 0;
        for def in &self.defs {
            let interval = match parse_interval(&def.interval) {
                Ok(interval) => interval,
                Err(err) => {
                    tracing::warn!(heartbeat = %def.name, error = %err, "bad interval, skipping");
                    continue;
                }
            };
            let due = self
                .last_fired
                .lock()
                .get(&def.name)
                .is_none_or(|last| now.duration_since(*last) >= interval);
            if !due {
                continue;
            }
            self.last_fired.lock().insert(def.name.clone(), now);

            tracing::info!(heartbeat = %def.name, "heartbeat due");
            if let Err(err) = self.run_one(def).await {
                tracing::warn!(heartbeat = %def.name, error = %err, "heartbeat run failed");
            }
            self.engine.bus().publish(Event::HeartbeatFired {
                name: def.name.clone(),
            });
            fired += 1;
        }
        fired
    }

    /// Tick forever. Intended for a dedicated task.
    pub async fn run_loop(&self, tick: Duration) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.run_due(Instant::now()).await;
        }
    }

    async fn run_one(&self, def: &HeartbeatDef) -> Result<(), EngineError> {
        let session_id = self.ensure_session(def)?;
        for skill_name in &def.skills {
            let graph = match self.loader.load(skill_name) {
                Ok(graph) => graph,
                Err(SkillError::Disabled(_)) => {
                    tracing::debug!(skill = %skill_name, "skill disabled, skipping");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(skill = %skill_name, error = %err, "cannot load skill, skipping");
                    continue;
                }
            };
            let session = self.engine.store().load(session_id)?;
            if session.status == SessionStatus::InterventionRequired {
                // A human has to unblock it; a headless tick must not.
                tracing::info!(heartbeat = %def.name, "session blocked on intervention, skipping");
                continue;
            }
            self.engine.run(&graph, session_id).await?;
        }
        Ok(())
    }

    /// Reuse the heartbeat's session when one exists, else create an
    /// ephemeral one anchored at the definition's path.
    fn ensure_session(&self, def: &HeartbeatDef) -> Result<Uuid, EngineError> {
        let title = format!("heartbeat:{}", def.name);
        if let Some(session) = self.engine.store().latest_by_title(&title)? {
            return Ok(session.id);
        }
        let mut session: Session =
            self.engine
                .store()
                .create(&def.path, &title, &self.default_agent)?;
        session.ephemeral = true;
        self.engine.store().save(&mut session)?;
        Ok(session.id)
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
