// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-address a session's anchor directory as a path-safe name.

use std::path::Path;

/// Flatten a working directory into a single path component: the native
/// separator becomes `-` and a leading separator is stripped, so
/// `/home/u/proj` maps to `home-u-proj`.
pub fn slug(cwd: &Path) -> String {
    let sep = std::path::MAIN_SEPARATOR;
    cwd.to_string_lossy()
        .trim_start_matches(sep)
        .replace(sep, "-")
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod tests;
