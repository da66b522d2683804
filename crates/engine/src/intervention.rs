// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session intervention coordination.
//!
//! The engine registers a single-slot waiter when a run blocks; a
//! resolution consumes it. Resolutions arriving with no waiter are
//! dropped (the interface is expected to observe `task_blocked` before
//! sending), and `resolve` reports whether anything consumed the action.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Human decision on a blocked run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterventionAction {
    /// Clear the retry counter and try the state again
    Retry,
    /// Take the state's fail route
    ProceedToFail,
    /// Terminate the run as failed
    Abort,
}

impl fmt::Display for InterventionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterventionAction::Retry => write!(f, "retry"),
            InterventionAction::ProceedToFail => write!(f, "proceed_to_fail"),
            InterventionAction::Abort => write!(f, "abort"),
        }
    }
}

impl std::str::FromStr for InterventionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retry" => Ok(InterventionAction::Retry),
            "proceed_to_fail" | "proceed-to-fail" => Ok(InterventionAction::ProceedToFail),
            "abort" => Ok(InterventionAction::Abort),
            other => Err(format!("unknown intervention action: {}", other)),
        }
    }
}

/// Lazily-created single-slot channels, one per blocked session.
#[derive(Clone, Default)]
pub(crate) struct InterventionHub {
    waiters: Arc<RwLock<HashMap<Uuid, oneshot::Sender<InterventionAction>>>>,
}

impl InterventionHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block until a resolution arrives for `session_id`.
    ///
    /// Returns `None` if the waiter was displaced (a newer run blocked on
    /// the same session) or the hub dropped.
    pub(crate) async fn wait(&self, session_id: Uuid) -> Option<InterventionAction> {
        let (tx, rx) = oneshot::channel();
        self.waiters.write().insert(session_id, tx);
        let action = rx.await.ok();
        // On displacement the slot belongs to the newer waiter; only a
        // delivered resolution has already removed it.
        action
    }

    /// Deliver a resolution to the waiting run, if one is blocked.
    /// Returns whether anything consumed it.
    pub(crate) fn resolve(&self, session_id: Uuid, action: InterventionAction) -> bool {
        match self.waiters.write().remove(&session_id) {
            Some(tx) => tx.send(action).is_ok(),
            None => {
                tracing::debug!(%session_id, %action, "intervention dropped: no waiter");
                false
            }
        }
    }

    /// Whether a run is currently blocked on this session.
    #[cfg(test)]
    pub(crate) fn has_waiter(&self, session_id: Uuid) -> bool {
        self.waiters.read().contains_key(&session_id)
    }
}

#[cfg(test)]
#[path = "intervention_tests.rs"]
mod tests;
