// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interface-instance registry: pins an interface instance (a REPL
//! process, a chat conversation) to its focused session.
//!
//! All mutations serialize through an exclusive advisory lock on
//! `.registry.lock` around a re-read / mutate / write cycle, so multiple
//! gateway processes share one registry safely. Reads are served from an
//! in-memory map refreshed on every locked write and on [`Registry::sync`];
//! a stale read is acceptable because every state-changing operation
//! re-locks and re-reads.

use crate::StoreError;
use fs2::FileExt;
use gantry_core::Verbosity;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use uuid::Uuid;

/// Per-instance state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub verbosity: Verbosity,
    /// Descriptor of a pending multi-step interface action, if any
    #[serde(default)]
    pub pending_action: Option<String>,
}

/// Advisory-locked map of `instance_id` → [`InstanceState`].
pub struct Registry {
    path: PathBuf,
    lock_path: PathBuf,
    cache: Mutex<HashMap<String, InstanceState>>,
}

impl Registry {
    /// `root` is the storage root; the registry lives at
    /// `<root>/registry.json` with `<root>/.registry.lock` beside it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            path: root.join("registry.json"),
            lock_path: root.join(".registry.lock"),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Focus an instance on a session.
    pub fn set(&self, instance_id: &str, session_id: Uuid) -> Result<(), StoreError> {
        self.mutate(|map| {
            map.entry(instance_id.to_string()).or_default().session_id = Some(session_id);
        })
    }

    pub fn set_verbosity(&self, instance_id: &str, level: Verbosity) -> Result<(), StoreError> {
        self.mutate(|map| {
            map.entry(instance_id.to_string()).or_default().verbosity = level;
        })
    }

    pub fn set_pending_action(
        &self,
        instance_id: &str,
        action: Option<String>,
    ) -> Result<(), StoreError> {
        self.mutate(|map| {
            map.entry(instance_id.to_string()).or_default().pending_action = action;
        })
    }

    /// Current state for an instance, from the in-memory map.
    pub fn get(&self, instance_id: &str) -> InstanceState {
        self.cache
            .lock()
            .get(instance_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Re-read the on-disk map into memory.
    pub fn sync(&self) -> Result<(), StoreError> {
        let lock = self.acquire_lock()?;
        let map = self.read_map();
        *self.cache.lock() = map;
        let _ = FileExt::unlock(&lock);
        Ok(())
    }

    fn mutate(
        &self,
        apply: impl FnOnce(&mut HashMap<String, InstanceState>),
    ) -> Result<(), StoreError> {
        let lock = self.acquire_lock()?;
        let result = self.mutate_locked(apply);
        let _ = FileExt::unlock(&lock);
        result
    }

    fn mutate_locked(
        &self,
        apply: impl FnOnce(&mut HashMap<String, InstanceState>),
    ) -> Result<(), StoreError> {
        let mut map = self.read_map();
        apply(&mut map);
        let json = serde_json::to_string_pretty(&map)?;
        std::fs::write(&self.path, json).map_err(|e| StoreError::io(&self.path, e))?;
        *self.cache.lock() = map;
        Ok(())
    }

    fn acquire_lock(&self) -> Result<File, StoreError> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| StoreError::io(&self.lock_path, e))?;
        lock.lock_exclusive()
            .map_err(|e| StoreError::io(&self.lock_path, e))?;
        Ok(lock)
    }

    fn read_map(&self) -> HashMap<String, InstanceState> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&text) {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "resetting corrupt instance registry");
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
