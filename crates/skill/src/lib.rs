// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Skill graphs: loading, validation, and fail-prompt templates.
//!
//! A skill is a named state graph stored under `<root>/skills/` as
//! `<name>/skill.json` (with optional sibling assets) or as a flat
//! `<name>.json`. Graphs are immutable after load; `@file` references in
//! instructions and commands are resolved at load time, confined to the
//! skill's own directory.

pub mod def;
pub mod loader;
pub mod registry;
pub mod template;
pub mod validate;

pub use def::{SkillGraph, StateDef, StateType};
pub use loader::SkillLoader;
pub use registry::SkillRegistry;
pub use template::{render, DEFAULT_FAIL_PROMPT};

use std::path::PathBuf;
use thiserror::Error;

/// Errors loading or validating a skill graph.
#[derive(Debug, Error)]
pub enum SkillError {
    #[error("skill not found: {0}")]
    NotFound(String),
    #[error("skill is disabled: {0}")]
    Disabled(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("asset reference escapes skill directory: {0}")]
    AssetEscape(String),
    #[error("asset not found: {path}: {source}")]
    AssetNotFound {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid skill '{skill}': {message}")]
    Invalid { skill: String, message: String },
}
