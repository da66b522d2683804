//! A two-state skill runs an agent turn, verifies it, and completes.

use crate::prelude::*;
use gantry_core::{AuditKind, SessionStatus};
use gantry_drivers::ScriptedRun;

#[tokio::test]
async fn two_state_skill_completes_with_the_expected_audit_trail() {
    let h = harness();
    h.driver.push_run(ScriptedRun::streaming("A", &["ok"]));
    let session = h.session();
    let skill = graph(
        "write-x",
        "s1",
        0,
        vec![
            ("s1", action_state("write x", "true", "end")),
            ("end", end_state()),
        ],
    );

    let status = h.engine.run(&skill, session.id).await.unwrap();
    assert_eq!(status, SessionStatus::Completed);

    let session = h.store.load(session.id).unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.role_cache["default"], "A");

    let kinds: Vec<AuditKind> = h.audit(session.id).iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            AuditKind::Status,
            AuditKind::LlmPrompt,
            AuditKind::LlmResponseChunk,
            AuditKind::CmdResult,
            AuditKind::Status,
        ]
    );
}

#[tokio::test]
async fn counters_are_zero_after_every_successful_advance() {
    let h = harness();
    h.driver.push_run(ScriptedRun::text("a"));
    h.driver.push_run(ScriptedRun::text("b"));
    let session = h.session();
    let skill = graph(
        "chain",
        "s1",
        0,
        vec![
            ("s1", action_state("one", "true", "s2")),
            ("s2", action_state("two", "true", "end")),
            ("end", end_state()),
        ],
    );

    h.engine.run(&skill, session.id).await.unwrap();
    let session = h.store.load(session.id).unwrap();
    assert_eq!(session.retry_count, 0);
    assert_eq!(session.loop_count, 0);
}
