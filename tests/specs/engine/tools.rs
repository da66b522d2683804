//! Tool states run commands without an LLM turn.

use crate::prelude::*;
use gantry_core::{AuditKind, SessionStatus};

#[tokio::test]
async fn tool_failure_routes_and_the_session_stays_runnable() {
    let h = harness();
    let session = h.session();
    let mut t1 = tool_state("false", "end");
    t1.on_fail_route = "recover".to_string();
    let skill = graph(
        "tools",
        "t1",
        0,
        vec![
            ("t1", t1),
            ("recover", tool_state("true", "end")),
            ("end", end_state()),
        ],
    );

    let status = h.engine.run(&skill, session.id).await.unwrap();
    assert_eq!(status, SessionStatus::Completed);

    // Both commands ran and no LLM turn happened.
    let audit = h.audit(session.id);
    let exits: Vec<i32> = audit
        .iter()
        .filter(|e| e.kind == AuditKind::CmdResult)
        .map(|e| e.exit_code.unwrap())
        .collect();
    assert_eq!(exits, [1, 0]);
    assert!(audit.iter().all(|e| e.kind != AuditKind::LlmPrompt));
    assert_eq!(h.driver.call_count(), 0);
}

#[tokio::test]
async fn tool_failure_without_a_route_terminates_failed() {
    let h = harness();
    let session = h.session();
    let skill = graph(
        "tools",
        "t1",
        0,
        vec![("t1", tool_state("false", "end")), ("end", end_state())],
    );

    let status = h.engine.run(&skill, session.id).await.unwrap();
    assert_eq!(status, SessionStatus::Failed);
    assert_eq!(
        h.store.load(session.id).unwrap().status,
        SessionStatus::Failed
    );
}
