// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events fanned out to interface adapters.

use crate::audit::AuditEntry;
use crate::session::SessionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An engine- or store-produced event published on the bus.
///
/// Delivery is best-effort per subscriber; the audit log is the canonical
/// record and adapters re-read it when they need completeness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// An entry was durably appended to a session's audit log
    Audit { session_id: Uuid, entry: AuditEntry },
    /// A session's status changed
    StatusChanged {
        session_id: Uuid,
        status: SessionStatus,
    },
    /// A run exhausted its budgets and is waiting for intervention
    TaskBlocked {
        session_id: Uuid,
        node: String,
        feedback: String,
    },
    /// A heartbeat definition became due and was executed
    HeartbeatFired { name: String },
}

impl Event {
    /// Session this event concerns, if any (adapters filter on it).
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Event::Audit { session_id, .. }
            | Event::StatusChanged { session_id, .. }
            | Event::TaskBlocked { session_id, .. } => Some(*session_id),
            Event::HeartbeatFired { .. } => None,
        }
    }
}
