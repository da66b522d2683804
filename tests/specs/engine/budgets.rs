//! Retry and loop budgets park the session for human intervention.

use crate::prelude::*;
use gantry_core::{Event, SessionStatus};
use gantry_drivers::ScriptedRun;
use gantry_engine::InterventionAction;

#[tokio::test]
async fn retry_budget_blocks_once_then_retry_and_abort() {
    let h = harness();
    for _ in 0..4 {
        h.driver.push_run(ScriptedRun::text("attempt"));
    }
    let session = h.session();
    let mut s1 = action_state("write x", "false", "end");
    s1.max_retries = 2;
    let skill = graph("retries", "s1", 0, vec![("s1", s1), ("end", end_state())]);

    let mut sub = h.bus.subscribe();
    let engine = h.engine.clone();
    let id = session.id;
    let task = tokio::spawn(async move { engine.run(&skill, id).await });

    next_blocked(&mut sub).await;
    // One task_blocked per blocking episode.
    resolve_soon(&h.engine, id, InterventionAction::Retry).await;
    next_blocked(&mut sub).await;
    resolve_soon(&h.engine, id, InterventionAction::Abort).await;

    assert_eq!(task.await.unwrap().unwrap(), SessionStatus::Failed);
    assert_eq!(h.driver.call_count(), 4);
}

#[tokio::test]
async fn loop_budget_blocks_a_self_routing_state() {
    let h = harness();
    for _ in 0..4 {
        h.driver.push_run(ScriptedRun::text("attempt"));
    }
    let session = h.session();
    let mut s1 = action_state("write x", "false", "end");
    s1.on_fail_route = "s1".to_string();
    let skill = graph("loops", "s1", 3, vec![("s1", s1), ("end", end_state())]);

    let mut sub = h.bus.subscribe();
    let engine = h.engine.clone();
    let id = session.id;
    let task = tokio::spawn(async move { engine.run(&skill, id).await });

    next_blocked(&mut sub).await;
    let blocked = h.store.load(id).unwrap();
    assert_eq!(blocked.status, SessionStatus::InterventionRequired);
    assert_eq!(blocked.loop_count, 3);

    resolve_soon(&h.engine, id, InterventionAction::Abort).await;
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn resolution_without_a_blocked_run_is_dropped() {
    let h = harness();
    let session = h.session();
    assert!(!h
        .engine
        .resolve_intervention(session.id, InterventionAction::Retry));
    assert_eq!(
        h.store.load(session.id).unwrap().status,
        SessionStatus::Idle
    );
}

#[tokio::test]
async fn task_blocked_carries_node_and_feedback() {
    let h = harness();
    h.driver.push_run(ScriptedRun::text("attempt"));
    let session = h.session();
    let mut s1 = action_state("write x", "false", "end");
    s1.max_retries = 1;
    s1.on_fail_prompt = "verify said no".to_string();
    let skill = graph("fb", "s1", 0, vec![("s1", s1), ("end", end_state())]);

    let mut sub = h.bus.subscribe();
    let engine = h.engine.clone();
    let id = session.id;
    let task = tokio::spawn(async move { engine.run(&skill, id).await });

    loop {
        if let Some(Event::TaskBlocked {
            session_id,
            node,
            feedback,
        }) = sub.recv().await
        {
            assert_eq!(session_id, id);
            assert_eq!(node, "s1");
            assert_eq!(feedback, "verify said no");
            break;
        }
    }

    resolve_soon(&h.engine, id, InterventionAction::Abort).await;
    task.await.unwrap().unwrap();
}
