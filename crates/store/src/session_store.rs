// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence: metadata, audit logs, and lookups.
//!
//! Layout under `<root>/sessions/`:
//!
//! ```text
//! <slug(cwd)>/<uuid>.meta.json       session metadata (temp+rename writes)
//! <slug(cwd)>/<uuid>.audit.jsonl     append-only audit log (+ .lock, .archive)
//! .index/<uuid>                      anchor-CWD hint for O(1) load
//! .global_index.json                 listing index, last-updated descending
//! ```

use crate::audit_log;
use crate::index::{GlobalIndex, IndexEntry};
use crate::slug::slug;
use crate::StoreError;
use chrono::Utc;
use gantry_bus::EventBus;
use gantry_core::{AuditEntry, Event, Session};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Hard cap on metadata files examined during a fallback scan.
pub const SCAN_CAP: usize = 500;

/// Stores sessions under a storage root and publishes audit events.
#[derive(Clone)]
pub struct SessionStore {
    sessions_dir: PathBuf,
    bus: EventBus,
    index: GlobalIndex,
}

impl SessionStore {
    /// `root` is the storage root; sessions live in `<root>/sessions/`.
    pub fn new(root: impl Into<PathBuf>, bus: EventBus) -> Self {
        let sessions_dir = root.into().join("sessions");
        let index = GlobalIndex::new(&sessions_dir);
        Self {
            sessions_dir,
            bus,
            index,
        }
    }

    /// Create, persist, and index a new session anchored at `cwd`.
    pub fn create(
        &self,
        cwd: impl Into<PathBuf>,
        title: impl Into<String>,
        agent: impl Into<String>,
    ) -> Result<Session, StoreError> {
        let mut session = Session::new(cwd, title, agent);
        self.save(&mut session)?;
        self.write_cwd_hint(&session)?;
        tracing::info!(id = %session.id, cwd = %session.cwd.display(), "created session");
        Ok(session)
    }

    /// Persist metadata atomically (temp file + rename) and refresh the
    /// global index. Bumps `updated_at`.
    pub fn save(&self, session: &mut Session) -> Result<(), StoreError> {
        session.updated_at = Utc::now();

        let dir = self.session_dir(&session.cwd);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let path = self.meta_path(session);
        let tmp = dir.join(format!(".{}.meta.json.tmp", session.id));

        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;

        if session.archived {
            self.index.remove(session.id)?;
        } else {
            self.index.upsert(IndexEntry::from_session(session))?;
        }
        Ok(())
    }

    /// Load by id: the CWD hint first, then a bounded systematic scan.
    pub fn load(&self, id: Uuid) -> Result<Session, StoreError> {
        let hint = self.hint_path(id);
        if let Ok(cwd) = std::fs::read_to_string(&hint) {
            let path = self
                .session_dir(Path::new(cwd.trim()))
                .join(format!("{}.meta.json", id));
            if path.is_file() {
                return read_meta(&path);
            }
        }
        self.scan_for(id)
    }

    /// Page through the global index (newest first). Falls back to a
    /// bounded directory scan when the index is absent or corrupt.
    pub fn list(
        &self,
        page: usize,
        page_size: usize,
        include_ephemeral: bool,
    ) -> Result<(Vec<IndexEntry>, usize), StoreError> {
        let filtered: Vec<IndexEntry> = self
            .entries()?
            .into_iter()
            .filter(|e| include_ephemeral || !e.ephemeral)
            .collect();
        let total = filtered.len();
        let entries = filtered
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok((entries, total))
    }

    /// Most recently updated non-ephemeral session.
    pub fn latest(&self) -> Result<Option<Session>, StoreError> {
        for entry in self.entries()? {
            if !entry.ephemeral {
                return Ok(Some(self.load(entry.id)?));
            }
        }
        Ok(None)
    }

    /// Most recently updated session with an exact title match
    /// (ephemeral sessions included).
    pub fn latest_by_title(&self, title: &str) -> Result<Option<Session>, StoreError> {
        for entry in self.entries()? {
            if entry.title == title {
                return Ok(Some(self.load(entry.id)?));
            }
        }
        Ok(None)
    }

    /// Archive a session: flip the flag, move the audit log aside, drop it
    /// from the index. Idempotent.
    pub fn archive(&self, id: Uuid) -> Result<(), StoreError> {
        let mut session = self.load(id)?;
        if session.archived {
            return Ok(());
        }
        let audit = self.audit_path(&session);
        if audit.exists() {
            let archived = audit_archive_path(&audit);
            std::fs::rename(&audit, &archived).map_err(|e| StoreError::io(&archived, e))?;
        }
        session.archived = true;
        self.save(&mut session)?;
        tracing::info!(id = %id, "archived session");
        Ok(())
    }

    /// Append one audit entry under the log's advisory lock, then publish
    /// it on the bus (after the bytes are durable).
    pub fn append_audit(&self, session: &Session, entry: &AuditEntry) -> Result<(), StoreError> {
        let dir = self.session_dir(&session.cwd);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let path = if session.archived {
            audit_archive_path(&self.audit_path(session))
        } else {
            self.audit_path(session)
        };
        audit_log::append_entry(&path, entry)?;
        self.bus.publish(Event::Audit {
            session_id: session.id,
            entry: entry.clone(),
        });
        Ok(())
    }

    /// Last `n` audit entries, oldest first.
    pub fn last_audit(
        &self,
        session: &Session,
        n: usize,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let path = if session.archived {
            audit_archive_path(&self.audit_path(session))
        } else {
            self.audit_path(session)
        };
        audit_log::read_last(&path, n)
    }

    /// Audit log path for a (non-archived) session.
    pub fn audit_path(&self, session: &Session) -> PathBuf {
        self.session_dir(&session.cwd)
            .join(format!("{}.audit.jsonl", session.id))
    }

    fn entries(&self) -> Result<Vec<IndexEntry>, StoreError> {
        match self.index.read() {
            Ok(entries) => Ok(entries),
            Err(err) => {
                tracing::warn!(error = %err, "global index unavailable, falling back to directory scan");
                self.scan_entries()
            }
        }
    }

    fn session_dir(&self, cwd: &Path) -> PathBuf {
        self.sessions_dir.join(slug(cwd))
    }

    fn meta_path(&self, session: &Session) -> PathBuf {
        self.session_dir(&session.cwd)
            .join(format!("{}.meta.json", session.id))
    }

    fn hint_path(&self, id: Uuid) -> PathBuf {
        self.sessions_dir.join(".index").join(id.to_string())
    }

    fn write_cwd_hint(&self, session: &Session) -> Result<(), StoreError> {
        let dir = self.sessions_dir.join(".index");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let path = self.hint_path(session.id);
        std::fs::write(&path, session.cwd.to_string_lossy().as_bytes())
            .map_err(|e| StoreError::io(&path, e))
    }

    /// Walk session directories looking for `<id>.meta.json`, examining at
    /// most [`SCAN_CAP`] metadata files.
    fn scan_for(&self, id: Uuid) -> Result<Session, StoreError> {
        let needle = format!("{}.meta.json", id);
        let mut examined = 0usize;
        for path in self.meta_files()? {
            if path.file_name().is_some_and(|n| n == needle.as_str()) {
                return read_meta(&path);
            }
            examined += 1;
            if examined >= SCAN_CAP {
                break;
            }
        }
        Err(StoreError::NotFound(id))
    }

    fn scan_entries(&self) -> Result<Vec<IndexEntry>, StoreError> {
        let mut entries = Vec::new();
        for path in self.meta_files()?.into_iter().take(SCAN_CAP) {
            match read_meta(&path) {
                Ok(session) if !session.archived => {
                    entries.push(IndexEntry::from_session(&session));
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable session metadata");
                }
            }
        }
        entries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(entries)
    }

    fn meta_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut files = Vec::new();
        let dirs = match std::fs::read_dir(&self.sessions_dir) {
            Ok(dirs) => dirs,
            Err(_) => return Ok(files),
        };
        for dir in dirs.flatten() {
            let path = dir.path();
            if !path.is_dir() || path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('.')) {
                continue;
            }
            let Ok(children) = std::fs::read_dir(&path) else {
                continue;
            };
            for child in children.flatten() {
                let child = child.path();
                if child
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(".meta.json"))
                {
                    files.push(child);
                }
            }
        }
        Ok(files)
    }
}

fn read_meta(path: &Path) -> Result<Session, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

fn audit_archive_path(audit: &Path) -> PathBuf {
    let mut name = audit
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".archive");
    audit.with_file_name(name)
}

#[cfg(test)]
#[path = "session_store_tests.rs"]
mod tests;
