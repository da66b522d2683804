// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::FakeDriver;

#[test]
fn registered_driver_is_retrievable_by_name() {
    let registry = DriverRegistry::new();
    registry.register(Arc::new(FakeDriver::named("claude")));
    registry.register(Arc::new(FakeDriver::named("codex")));

    assert!(registry.get("claude").is_some());
    assert!(registry.get("codex").is_some());
    assert!(registry.get("ghost").is_none());
    assert_eq!(registry.names(), ["claude", "codex"]);
}

#[test]
fn later_registration_replaces_earlier() {
    let registry = DriverRegistry::new();
    let first = Arc::new(FakeDriver::named("claude"));
    let second = Arc::new(FakeDriver::named("claude"));
    second.push_run(crate::ScriptedRun::text("marker"));

    registry.register(first);
    registry.register(second.clone());

    assert_eq!(registry.names(), ["claude"]);
    // The replacement carries the scripted state.
    assert_eq!(second.call_count(), 0);
}
