// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global session index: one JSON array sorted by last-updated descending,
//! mutated under an advisory lock on the index file itself.

use crate::StoreError;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use gantry_core::Session;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One row of the global index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: Uuid,
    pub cwd: PathBuf,
    pub title: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub ephemeral: bool,
}

impl IndexEntry {
    pub(crate) fn from_session(session: &Session) -> Self {
        Self {
            id: session.id,
            cwd: session.cwd.clone(),
            title: session.title.clone(),
            last_updated: session.updated_at,
            ephemeral: session.ephemeral,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GlobalIndex {
    path: PathBuf,
}

impl GlobalIndex {
    pub(crate) fn new(sessions_dir: &Path) -> Self {
        Self {
            path: sessions_dir.join(".global_index.json"),
        }
    }

    /// Insert or refresh an entry and re-sort.
    pub(crate) fn upsert(&self, entry: IndexEntry) -> Result<(), StoreError> {
        self.mutate(|entries| {
            entries.retain(|e| e.id != entry.id);
            entries.push(entry);
        })
    }

    pub(crate) fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        self.mutate(|entries| entries.retain(|e| e.id != id))
    }

    /// Read the index without locking. An absent or corrupt index is an
    /// error so callers can fall back to a directory scan.
    pub(crate) fn read(&self) -> Result<Vec<IndexEntry>, StoreError> {
        let text =
            std::fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn mutate(&self, apply: impl FnOnce(&mut Vec<IndexEntry>)) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.lock_exclusive()
            .map_err(|e| StoreError::io(&self.path, e))?;

        let result = self.mutate_locked(&mut file, apply);
        let _ = FileExt::unlock(&file);
        result
    }

    fn mutate_locked(
        &self,
        file: &mut File,
        apply: impl FnOnce(&mut Vec<IndexEntry>),
    ) -> Result<(), StoreError> {
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|e| StoreError::io(&self.path, e))?;
        let mut entries: Vec<IndexEntry> = if text.trim().is_empty() {
            Vec::new()
        } else {
            match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(err) => {
                    // Corruption is non-fatal: rebuild from this mutation on.
                    tracing::warn!(path = %self.path.display(), error = %err, "resetting corrupt global index");
                    Vec::new()
                }
            }
        };

        apply(&mut entries);
        entries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));

        let out = serde_json::to_string(&entries)?;
        file.set_len(0).map_err(|e| StoreError::io(&self.path, e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(out.as_bytes())
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.sync_data().map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
