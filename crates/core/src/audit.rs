// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit records attached to a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Prompt sent to the agent
    LlmPrompt,
    /// Full agent response (used when the driver did not stream chunks)
    LlmResponse,
    /// Streamed visible-text fragment
    LlmResponseChunk,
    /// Streamed chain-of-thought fragment
    LlmThought,
    /// Shell command result
    CmdResult,
    /// Human intervention decision
    Intervention,
    /// Session status transition
    Status,
    Info,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditKind::LlmPrompt => write!(f, "llm_prompt"),
            AuditKind::LlmResponse => write!(f, "llm_response"),
            AuditKind::LlmResponseChunk => write!(f, "llm_response_chunk"),
            AuditKind::LlmThought => write!(f, "llm_thought"),
            AuditKind::CmdResult => write!(f, "cmd_result"),
            AuditKind::Intervention => write!(f, "intervention"),
            AuditKind::Status => write!(f, "status"),
            AuditKind::Info => write!(f, "info"),
        }
    }
}

/// Conversational role classification of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditRole {
    User,
    Assistant,
    System,
}

/// One line of a session's audit JSONL log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: AuditKind,
    /// Who produced the entry (e.g. "engine", "user", or a role name)
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<AuditRole>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl AuditEntry {
    /// Create an entry timestamped now.
    pub fn new(kind: AuditKind, source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            source: source.into(),
            role: None,
            content: content.into(),
            exit_code: None,
        }
    }

    pub fn with_role(mut self, role: AuditRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
