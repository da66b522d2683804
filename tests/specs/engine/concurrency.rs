//! Single-run-per-session guard across parallel callers.

use crate::prelude::*;
use gantry_core::{AuditKind, SessionStatus};
use gantry_drivers::ScriptedRun;
use gantry_engine::InterventionAction;

#[tokio::test]
async fn parallel_runs_execute_once() {
    let h = harness();
    h.driver.push_run(ScriptedRun::text("attempt"));
    let session = h.session();
    let mut s1 = action_state("write x", "false", "end");
    s1.max_retries = 1;
    let skill = graph("guard", "s1", 0, vec![("s1", s1), ("end", end_state())]);

    let mut sub = h.bus.subscribe();
    let engine = h.engine.clone();
    let id = session.id;
    let first_skill = skill.clone();
    let first = tokio::spawn(async move { engine.run(&first_skill, id).await });
    next_blocked(&mut sub).await;

    // The second caller gets an immediate no-op.
    let second = h.engine.run(&skill, id).await.unwrap();
    assert_eq!(second, SessionStatus::Running);
    assert!(h.engine.is_running(id));

    resolve_soon(&h.engine, id, InterventionAction::Abort).await;
    first.await.unwrap().unwrap();
    assert!(!h.engine.is_running(id));

    let started = h
        .audit(id)
        .iter()
        .filter(|e| e.kind == AuditKind::Status && e.content.starts_with("started skill"))
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn prompt_turns_share_the_single_run_guard() {
    let h = harness();
    h.driver.push_run(ScriptedRun::text("attempt"));
    let session = h.session();
    let mut s1 = action_state("write x", "false", "end");
    s1.max_retries = 1;
    let skill = graph("guard", "s1", 0, vec![("s1", s1), ("end", end_state())]);

    let mut sub = h.bus.subscribe();
    let engine = h.engine.clone();
    let id = session.id;
    let task = tokio::spawn(async move { engine.run(&skill, id).await });
    next_blocked(&mut sub).await;

    assert!(h.engine.execute_prompt(id, "hello").await.is_err());

    resolve_soon(&h.engine, id, InterventionAction::Abort).await;
    task.await.unwrap().unwrap();
}
