// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loads skill graphs from disk and resolves `@file` asset references.

use crate::def::SkillGraph;
use crate::registry::SkillRegistry;
use crate::validate::validate;
use crate::SkillError;
use std::path::{Component, Path, PathBuf};

/// Locates, parses, and validates skills under a storage root.
#[derive(Debug, Clone)]
pub struct SkillLoader {
    skills_root: PathBuf,
    registry_path: PathBuf,
}

impl SkillLoader {
    /// `root` is the storage root; skills live in `<root>/skills/` and the
    /// enablement registry at `<root>/skills_registry.json`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            skills_root: root.join("skills"),
            registry_path: root.join("skills_registry.json"),
        }
    }

    /// Load a skill by name, refusing disabled skills.
    ///
    /// `<skills>/<name>/skill.json` wins over flat `<skills>/<name>.json`.
    pub fn load(&self, name: &str) -> Result<SkillGraph, SkillError> {
        if !SkillRegistry::load(&self.registry_path).is_enabled(name) {
            return Err(SkillError::Disabled(name.to_string()));
        }

        let (path, asset_dir) = self.locate(name)?;
        tracing::debug!(skill = name, path = %path.display(), "loading skill");
        let text = std::fs::read_to_string(&path).map_err(|source| SkillError::Read {
            path: path.clone(),
            source,
        })?;
        let mut graph: SkillGraph =
            serde_json::from_str(&text).map_err(|source| SkillError::Parse { path, source })?;
        resolve_refs(&mut graph, &asset_dir)?;
        validate(&graph)?;
        Ok(graph)
    }

    /// Names of all enabled skills on disk, sorted.
    pub fn list(&self) -> Vec<String> {
        let registry = SkillRegistry::load(&self.registry_path);
        let mut names = Vec::new();
        let entries = match std::fs::read_dir(&self.skills_root) {
            Ok(entries) => entries,
            Err(_) => return names,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = if path.is_dir() && path.join("skill.json").is_file() {
                path.file_name().map(|n| n.to_string_lossy().into_owned())
            } else if path.extension().is_some_and(|e| e == "json") {
                path.file_stem().map(|n| n.to_string_lossy().into_owned())
            } else {
                None
            };
            if let Some(name) = name {
                if registry.is_enabled(&name) {
                    names.push(name);
                }
            }
        }
        names.sort();
        names.dedup();
        names
    }

    fn locate(&self, name: &str) -> Result<(PathBuf, PathBuf), SkillError> {
        let dir = self.skills_root.join(name);
        let nested = dir.join("skill.json");
        if nested.is_file() {
            return Ok((nested, dir));
        }
        let flat = self.skills_root.join(format!("{}.json", name));
        if flat.is_file() {
            return Ok((flat, self.skills_root.clone()));
        }
        Err(SkillError::NotFound(name.to_string()))
    }
}

/// Resolve `@file` references: instructions are inlined, commands become
/// absolute script paths. References are confined to `asset_dir`.
fn resolve_refs(graph: &mut SkillGraph, asset_dir: &Path) -> Result<(), SkillError> {
    for state in graph.states.values_mut() {
        if let Some(rel) = state.instruction.strip_prefix('@') {
            let path = safe_join(asset_dir, rel)?;
            state.instruction =
                std::fs::read_to_string(&path).map_err(|source| SkillError::AssetNotFound {
                    path: path.clone(),
                    source,
                })?;
        }
        for cmd in [
            &mut state.pre_action_cmd,
            &mut state.verify_cmd,
            &mut state.post_action_cmd,
            &mut state.command,
        ] {
            if let Some(rel) = cmd.strip_prefix('@') {
                let path = safe_join(asset_dir, rel)?;
                let abs = path
                    .canonicalize()
                    .map_err(|source| SkillError::AssetNotFound { path, source })?;
                *cmd = abs.to_string_lossy().into_owned();
            }
        }
    }
    Ok(())
}

fn safe_join(dir: &Path, rel: &str) -> Result<PathBuf, SkillError> {
    let rel_path = Path::new(rel);
    let escapes = rel_path.is_absolute()
        || rel_path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
    if escapes {
        return Err(SkillError::AssetEscape(rel.to_string()));
    }
    Ok(dir.join(rel_path))
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
