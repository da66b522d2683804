//! Chain-of-thought extraction across chunk boundaries.

use crate::prelude::*;
use gantry_core::AuditKind;
use gantry_drivers::{DriverEvent, ScriptedRun};

#[tokio::test]
async fn thought_tags_split_across_chunks_are_reassembled() {
    let h = harness();
    h.driver.push_run(ScriptedRun {
        events: vec![
            DriverEvent::Chunk("<tho".to_string()),
            DriverEvent::Chunk("ught>think</thou".to_string()),
            DriverEvent::Chunk("ght> done".to_string()),
        ],
        final_text: String::new(),
        error: None,
    });
    let session = h.session();
    let skill = graph(
        "cot",
        "s1",
        0,
        vec![
            ("s1", action_state("write x", "true", "end")),
            ("end", end_state()),
        ],
    );

    h.engine.run(&skill, session.id).await.unwrap();

    let audit = h.audit(session.id);
    let thought: String = audit
        .iter()
        .filter(|e| e.kind == AuditKind::LlmThought)
        .map(|e| e.content.clone())
        .collect();
    let text: String = audit
        .iter()
        .filter(|e| e.kind == AuditKind::LlmResponseChunk)
        .map(|e| e.content.clone())
        .collect();
    assert_eq!(thought, "think");
    assert_eq!(text, " done");
}

#[tokio::test]
async fn comparison_operators_are_not_mistaken_for_tags() {
    let h = harness();
    h.driver.push_run(ScriptedRun {
        events: vec![DriverEvent::Chunk("Value < 100 is fine".to_string())],
        final_text: String::new(),
        error: None,
    });
    let session = h.session();
    let skill = graph(
        "cot",
        "s1",
        0,
        vec![
            ("s1", action_state("write x", "true", "end")),
            ("end", end_state()),
        ],
    );

    h.engine.run(&skill, session.id).await.unwrap();

    let text: String = h
        .audit(session.id)
        .iter()
        .filter(|e| e.kind == AuditKind::LlmResponseChunk)
        .map(|e| e.content.clone())
        .collect();
    assert_eq!(text, "Value < 100 is fine");
}
