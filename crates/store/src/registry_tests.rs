// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn set_and_get_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(dir.path());
    let session = Uuid::new_v4();

    registry.set("cli-123", session).unwrap();
    registry.set_verbosity("cli-123", Verbosity::High).unwrap();

    let state = registry.get("cli-123");
    assert_eq!(state.session_id, Some(session));
    assert_eq!(state.verbosity, Verbosity::High);
    assert_eq!(state.pending_action, None);
}

#[test]
fn unknown_instance_is_default() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(dir.path());
    let state = registry.get("tg-999");
    assert_eq!(state, InstanceState::default());
    assert_eq!(state.verbosity, Verbosity::Medium);
}

#[test]
fn mutations_are_visible_to_a_second_registry_after_sync() {
    let dir = tempfile::tempdir().unwrap();
    let a = Registry::new(dir.path());
    let b = Registry::new(dir.path());
    let session = Uuid::new_v4();

    a.set("cli-1", session).unwrap();

    // b has not read the file yet.
    assert_eq!(b.get("cli-1"), InstanceState::default());
    b.sync().unwrap();
    assert_eq!(b.get("cli-1").session_id, Some(session));
}

#[test]
fn pending_action_can_be_set_and_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(dir.path());

    registry
        .set_pending_action("tg-5", Some("confirm-archive".to_string()))
        .unwrap();
    assert_eq!(
        registry.get("tg-5").pending_action.as_deref(),
        Some("confirm-archive")
    );

    registry.set_pending_action("tg-5", None).unwrap();
    assert_eq!(registry.get("tg-5").pending_action, None);
}

#[test]
fn corrupt_registry_file_resets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("registry.json"), "\"not a map").unwrap();
    let registry = Registry::new(dir.path());

    registry.set("cli-1", Uuid::new_v4()).unwrap();
    registry.sync().unwrap();
    assert!(registry.get("cli-1").session_id.is_some());
}
