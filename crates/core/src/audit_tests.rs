// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn entry_round_trips_all_fields() {
    let entry = AuditEntry::new(AuditKind::CmdResult, "engine", "cargo test failed")
        .with_role(AuditRole::System)
        .with_exit_code(101);

    let line = serde_json::to_string(&entry).unwrap();
    let back: AuditEntry = serde_json::from_str(&line).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn kind_serializes_snake_case() {
    let entry = AuditEntry::new(AuditKind::LlmResponseChunk, "coder", "hi");
    let line = serde_json::to_string(&entry).unwrap();
    assert!(line.contains("\"type\":\"llm_response_chunk\""));
}

#[test]
fn optional_fields_are_omitted_when_absent() {
    let entry = AuditEntry::new(AuditKind::Info, "engine", "note");
    let line = serde_json::to_string(&entry).unwrap();
    assert!(!line.contains("\"role\""));
    assert!(!line.contains("\"exit_code\""));
}

#[test]
fn timestamp_is_rfc3339() {
    let entry = AuditEntry::new(AuditKind::Status, "engine", "running");
    let value: serde_json::Value = serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
    let ts = value["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
}
