// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{{var}}` substitution for fail-prompt templates.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("constant regex pattern is valid"));

/// Fallback fail-prompt when a state does not declare one.
pub const DEFAULT_FAIL_PROMPT: &str = "The verification command failed with exit code {{exit_code}}.\n\nOutput:\n{{output}}\n\nFix the problems shown above and try again.";

/// Substitute `{{name}}` placeholders from `vars`.
///
/// Unknown placeholders are left intact so typos stay visible in the
/// rendered prompt instead of silently disappearing.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    VAR_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
