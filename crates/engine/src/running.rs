// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-run-per-session guard.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Concurrent set of sessions with an execution in flight. Membership is
/// checked and set atomically at run entry; the guard clears it on drop,
/// so panics and early returns release the slot too.
#[derive(Clone, Default)]
pub(crate) struct RunningSet {
    inner: Arc<Mutex<HashSet<Uuid>>>,
}

impl RunningSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claim the session; `None` when a run is already in flight.
    pub(crate) fn try_acquire(&self, id: Uuid) -> Option<RunGuard> {
        if self.inner.lock().insert(id) {
            Some(RunGuard {
                set: self.clone(),
                id,
            })
        } else {
            None
        }
    }

    pub(crate) fn is_running(&self, id: Uuid) -> bool {
        self.inner.lock().contains(&id)
    }
}

pub(crate) struct RunGuard {
    set: RunningSet,
    id: Uuid,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.set.inner.lock().remove(&self.id);
    }
}

#[cfg(test)]
#[path = "running_tests.rs"]
mod tests;
