// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistent substrate for sessions: atomically-written metadata,
//! append-only JSONL audit logs, a global session index, and the
//! advisory-locked interface-instance registry.

mod audit_log;
mod index;
pub mod registry;
pub mod session_store;
pub mod slug;

pub use index::IndexEntry;
pub use registry::{InstanceState, Registry};
pub use session_store::SessionStore;
pub use slug::slug;

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors from the session store and registry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(Uuid),
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
