// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway configuration: storage root, default backend, model-tier maps.
//!
//! Loaded from `<root>/config.toml` when present; every scalar can be
//! overridden by a `GANTRY_*` environment variable.

use crate::session::ModelTier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default loop budget when neither the skill nor the config sets one.
pub const DEFAULT_MAX_LOOPS: u32 = 5;

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no home directory and GANTRY_ROOT is not set")]
    NoRoot,
    #[error("invalid {var}: {message}")]
    InvalidEnv { var: String, message: String },
}

/// Per-backend settings: binary path and tier → model-name map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    pub bin: String,
    #[serde(default)]
    pub tier_models: HashMap<ModelTier, String>,
}

/// Resolved gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage root (sessions, skills, registry, heartbeats)
    pub root: PathBuf,
    /// Agent backend used for new sessions
    pub default_agent: String,
    pub default_model_tier: Option<ModelTier>,
    /// Skill-wide loop budget applied when a skill does not set its own
    pub default_max_loops: u32,
    pub backends: HashMap<String, BackendConfig>,
}

/// On-disk shape of `config.toml`. Everything optional.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    root: Option<PathBuf>,
    default_agent: Option<String>,
    default_model_tier: Option<ModelTier>,
    default_max_loops: Option<u32>,
    #[serde(default)]
    backends: HashMap<String, BackendConfig>,
}

impl Config {
    /// Load configuration: defaults, then `config.toml`, then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let root = match std::env::var_os("GANTRY_ROOT") {
            Some(v) => PathBuf::from(v),
            None => dirs::home_dir().ok_or(ConfigError::NoRoot)?.join(".gantry"),
        };
        Self::load_from(root)
    }

    /// Load configuration rooted at an explicit directory (tests, `--root`).
    pub fn load_from(root: PathBuf) -> Result<Self, ConfigError> {
        let path = root.join("config.toml");
        let raw = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            toml::from_str::<RawConfig>(&text)
                .map_err(|source| ConfigError::Parse { path, source })?
        } else {
            RawConfig::default()
        };

        let mut config = Self {
            // GANTRY_ROOT already won over the file in load(); a root set in
            // the file only matters when loading via an explicit path.
            root: raw.root.unwrap_or(root),
            default_agent: raw.default_agent.unwrap_or_else(|| "claude".to_string()),
            default_model_tier: raw.default_model_tier,
            default_max_loops: raw.default_max_loops.unwrap_or(DEFAULT_MAX_LOOPS),
            backends: raw.backends,
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("GANTRY_AGENT") {
            if !v.is_empty() {
                self.default_agent = v;
            }
        }
        if let Ok(v) = std::env::var("GANTRY_MODEL_TIER") {
            if !v.is_empty() {
                let tier = v.parse().map_err(|message| ConfigError::InvalidEnv {
                    var: "GANTRY_MODEL_TIER".to_string(),
                    message,
                })?;
                self.default_model_tier = Some(tier);
            }
        }
        if let Ok(v) = std::env::var("GANTRY_MAX_LOOPS") {
            if !v.is_empty() {
                self.default_max_loops =
                    v.parse().map_err(|_| ConfigError::InvalidEnv {
                        var: "GANTRY_MAX_LOOPS".to_string(),
                        message: format!("not a number: {}", v),
                    })?;
            }
        }
        Ok(())
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.root.join("skills")
    }

    pub fn heartbeats_dir(&self) -> PathBuf {
        self.root.join("heartbeats")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join("registry.json")
    }

    pub fn skills_registry_path(&self) -> PathBuf {
        self.root.join("skills_registry.json")
    }

    /// Combined diagnostic stream for all spawned agent subprocesses:
    /// a `.log` sibling of the storage root (`~/.gantry` → `~/.gantry.log`).
    pub fn agent_log_path(&self) -> PathBuf {
        append_extension(&self.root, "log")
    }

    /// Backend settings for a driver name, if configured.
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.get(name)
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(ext);
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
