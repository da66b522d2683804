// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL audit files.
//!
//! Appends serialize one newline-terminated JSON object while holding an
//! exclusive advisory lock on a sibling `.lock` file, so concurrent
//! appenders from different processes never interleave bytes within a
//! line. Tail reads walk the file backwards in fixed-size blocks.

use crate::StoreError;
use fs2::FileExt;
use gantry_core::AuditEntry;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Block size for backward tail reads.
const TAIL_BLOCK: u64 = 4096;

/// Sibling lock path for an audit file.
pub(crate) fn lock_path_for(audit: &Path) -> PathBuf {
    let mut name = audit
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    audit.with_file_name(name)
}

/// Append one entry under the advisory lock. The bytes are synced before
/// the lock is released.
pub(crate) fn append_entry(path: &Path, entry: &AuditEntry) -> Result<(), StoreError> {
    let lock_path = lock_path_for(path);
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .open(&lock_path)
        .map_err(|e| StoreError::io(&lock_path, e))?;
    lock.lock_exclusive()
        .map_err(|e| StoreError::io(&lock_path, e))?;

    let result = append_unlocked(path, entry);
    let _ = FileExt::unlock(&lock);
    result
}

fn append_unlocked(path: &Path, entry: &AuditEntry) -> Result<(), StoreError> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| StoreError::io(path, e))?;
    file.sync_data().map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

/// Read the last `n` entries, oldest first.
///
/// Walks the file backwards in [`TAIL_BLOCK`]-sized reads, carrying the
/// partial line at each window boundary into the next block, until `n`
/// complete lines are recovered or the file is exhausted. Lines that fail
/// to parse are skipped with a warning.
pub(crate) fn read_last(path: &Path, n: usize) -> Result<Vec<AuditEntry>, StoreError> {
    if n == 0 || !path.exists() {
        return Ok(Vec::new());
    }
    let mut file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| StoreError::io(path, e))?
        .len();

    let mut lines: Vec<Vec<u8>> = Vec::new(); // newest first
    let mut pending: Vec<u8> = Vec::new(); // fragment continuing into earlier blocks
    let mut pos = len;

    while pos > 0 && lines.len() < n {
        let size = TAIL_BLOCK.min(pos);
        pos -= size;
        file.seek(SeekFrom::Start(pos))
            .map_err(|e| StoreError::io(path, e))?;
        let mut buf = vec![0u8; size as usize];
        file.read_exact(&mut buf)
            .map_err(|e| StoreError::io(path, e))?;
        buf.extend_from_slice(&pending);

        let mut end = buf.len();
        while lines.len() < n {
            let Some(nl) = buf[..end].iter().rposition(|&b| b == b'\n') else {
                break;
            };
            let line = &buf[nl + 1..end];
            if !line.is_empty() {
                lines.push(line.to_vec());
            }
            end = nl;
        }
        pending = buf[..end].to_vec();
    }

    if pos == 0 && !pending.is_empty() && lines.len() < n {
        lines.push(pending);
    }

    let mut entries = Vec::with_capacity(lines.len());
    for line in lines.into_iter().rev() {
        match serde_json::from_slice::<AuditEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unparseable audit line");
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
#[path = "audit_log_tests.rs"]
mod tests;
