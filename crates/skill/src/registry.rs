// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skill enablement registry (`skills_registry.json`).

use std::collections::HashMap;
use std::path::Path;

/// Map of skill name → enabled flag. Skills absent from the file are
/// enabled; an absent or unreadable file enables everything.
#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    enabled: HashMap<String, bool>,
}

impl SkillRegistry {
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<HashMap<String, bool>>(&text) {
            Ok(enabled) => Self { enabled },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring corrupt skills registry");
                Self::default()
            }
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.get(name).copied().unwrap_or(true)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
