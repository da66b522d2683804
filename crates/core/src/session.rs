// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state: the persistent unit of conversation, anchored to a
//! working directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Status of a session's current (or most recent) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No run in progress
    Idle,
    /// A skill run or prompt turn is executing
    Running,
    /// A budget was exhausted; a human must decide how to proceed
    InterventionRequired,
    /// The run reached an end state
    Completed,
    /// The run failed or was aborted
    Failed,
}

impl SessionStatus {
    /// Whether this status ends the current run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::InterventionRequired => write!(f, "intervention_required"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Policy for automatic acceptance of agent-proposed edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalMode {
    /// Read-only planning; the agent may not write
    #[default]
    Plan,
    /// Edits are applied automatically, other actions still gated
    AutoEdit,
    /// Unrestricted
    Yolo,
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalMode::Plan => write!(f, "PLAN"),
            ApprovalMode::AutoEdit => write!(f, "AUTO_EDIT"),
            ApprovalMode::Yolo => write!(f, "YOLO"),
        }
    }
}

/// Abstract model quality/cost selector, mapped to concrete backend model
/// names by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    High,
    Medium,
    Low,
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTier::High => write!(f, "high"),
            ModelTier::Medium => write!(f, "medium"),
            ModelTier::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(ModelTier::High),
            "medium" => Ok(ModelTier::Medium),
            "low" => Ok(ModelTier::Low),
            other => Err(format!("unknown model tier: {}", other)),
        }
    }
}

/// How much of the event stream an interface instance wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verbosity {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verbosity::Low => write!(f, "LOW"),
            Verbosity::Medium => write!(f, "MEDIUM"),
            Verbosity::High => write!(f, "HIGH"),
        }
    }
}

/// Persistent session metadata.
///
/// The anchor `cwd` is set at creation and never mutated afterwards; all
/// skill commands and agent subprocesses run with it as their working
/// directory. `role_cache` maps a conversational role name (e.g.
/// "architect", "default") to the agent-native session id the driver
/// reported for that role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub cwd: PathBuf,
    pub title: String,
    /// Name of the agent backend this session uses (driver registry key)
    pub agent: String,
    #[serde(default)]
    pub role_cache: HashMap<String, String>,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub active_node: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub loop_count: u32,
    pub status: SessionStatus,
    /// Verification output or error text carried into the next prompt
    #[serde(default)]
    pub pending_feedback: String,
    #[serde(default)]
    pub approval: ApprovalMode,
    #[serde(default)]
    pub model_tier: Option<ModelTier>,
    /// Monetary budget cap in USD; 0 means unlimited
    #[serde(default)]
    pub budget_usd: f64,
    /// Excluded from user-visible listings
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub archived: bool,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new idle session anchored at `cwd`.
    pub fn new(cwd: impl Into<PathBuf>, title: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            cwd: cwd.into(),
            title: title.into(),
            agent: agent.into(),
            role_cache: HashMap::new(),
            skill: None,
            active_node: None,
            retry_count: 0,
            loop_count: 0,
            status: SessionStatus::Idle,
            pending_feedback: String::new(),
            approval: ApprovalMode::default(),
            model_tier: None,
            budget_usd: 0.0,
            ephemeral: false,
            archived: false,
            updated_at: Utc::now(),
        }
    }

    /// Agent-native session id cached for a conversational role, if any.
    pub fn cached_role_id(&self, role: &str) -> Option<&str> {
        self.role_cache
            .get(role)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Reset both budget counters (state success, user retry).
    pub fn reset_counters(&mut self) {
        self.retry_count = 0;
        self.loop_count = 0;
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
