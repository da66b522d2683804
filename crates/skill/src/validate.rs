// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural validation of a loaded skill graph.

use crate::def::{SkillGraph, StateType};
use crate::SkillError;

fn invalid(graph: &SkillGraph, message: String) -> SkillError {
    SkillError::Invalid {
        skill: graph.skill_name.clone(),
        message,
    }
}

/// Validate a graph after `@file` resolution.
///
/// Checks that the initial state and every transition target exist, and
/// that each state carries what its type requires: action-loop states an
/// instruction and a next state, tool states a command and a next state,
/// end states nothing outgoing.
pub fn validate(graph: &SkillGraph) -> Result<(), SkillError> {
    if graph.skill_name.is_empty() {
        return Err(invalid(graph, "skill_name is empty".to_string()));
    }
    if !graph.states.contains_key(&graph.initial_state) {
        return Err(invalid(
            graph,
            format!("initial_state '{}' does not exist", graph.initial_state),
        ));
    }

    for (name, state) in &graph.states {
        for (field, target) in [("next", &state.next), ("on_fail_route", &state.on_fail_route)] {
            if !target.is_empty() && !graph.states.contains_key(target) {
                return Err(invalid(
                    graph,
                    format!("state '{}': {} target '{}' does not exist", name, field, target),
                ));
            }
        }

        match state.state_type {
            StateType::ActionLoop => {
                if state.instruction.is_empty() {
                    return Err(invalid(
                        graph,
                        format!("action_loop state '{}' has no instruction", name),
                    ));
                }
                if state.next.is_empty() {
                    return Err(invalid(
                        graph,
                        format!("action_loop state '{}' has no next state", name),
                    ));
                }
            }
            StateType::Tool => {
                if state.command.is_empty() {
                    return Err(invalid(
                        graph,
                        format!("tool state '{}' has no command", name),
                    ));
                }
                if state.next.is_empty() {
                    return Err(invalid(
                        graph,
                        format!("tool state '{}' has no next state", name),
                    ));
                }
            }
            StateType::End => {
                if !state.next.is_empty() || !state.command.is_empty() {
                    return Err(invalid(
                        graph,
                        format!("end state '{}' must not have next or command", name),
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
