// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skill graph definition types (immutable after load).

use gantry_core::{ApprovalMode, ModelTier};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a state executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateType {
    /// Issue an LLM turn, then verify the result with a shell command
    #[default]
    ActionLoop,
    /// Run a shell command without an LLM turn
    Tool,
    /// Terminal success state
    End,
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateType::ActionLoop => write!(f, "action_loop"),
            StateType::Tool => write!(f, "tool"),
            StateType::End => write!(f, "end"),
        }
    }
}

fn default_role() -> String {
    "default".to_string()
}

/// One state of a skill graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDef {
    #[serde(rename = "type", default)]
    pub state_type: StateType,
    /// Conversational role whose native session the LLM turn reuses
    #[serde(default = "default_role")]
    pub role: String,
    /// Prompt text, or `@file` resolved inline at load time
    #[serde(default)]
    pub instruction: String,
    /// Run once before the first LLM attempt of this state
    #[serde(default)]
    pub pre_action_cmd: String,
    /// Decides success of an action-loop attempt
    #[serde(default)]
    pub verify_cmd: String,
    /// Best-effort cleanup after a successful verify
    #[serde(default)]
    pub post_action_cmd: String,
    /// Command of a tool state
    #[serde(default)]
    pub command: String,
    /// Local retry budget; 0 means no local retries
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub next: String,
    #[serde(default)]
    pub on_fail_route: String,
    /// Feedback template; `{{exit_code}}`, `{{output}}`, `{{stdout}}`,
    /// `{{stderr}}` are substituted
    #[serde(default)]
    pub on_fail_prompt: String,
    #[serde(default)]
    pub approval: Option<ApprovalMode>,
    #[serde(default)]
    pub model_tier: Option<ModelTier>,
}

/// A named, immutable state graph describing an autonomous
/// verify-edit loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillGraph {
    pub skill_name: String,
    pub initial_state: String,
    /// Skill-wide loop budget; 0 defers to the engine default
    #[serde(default)]
    pub max_loops: u32,
    pub states: IndexMap<String, StateDef>,
}

impl SkillGraph {
    pub fn state(&self, name: &str) -> Option<&StateDef> {
        self.states.get(name)
    }
}

#[cfg(test)]
#[path = "def_tests.rs"]
mod tests;
