// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gantry_bus::EventBus;
use gantry_drivers::{DriverRegistry, FakeDriver};
use gantry_store::SessionStore;
use std::sync::Arc;
use tempfile::TempDir;
use yare::parameterized;

#[parameterized(
    bare = { "90", 90 },
    seconds = { "90s", 90 },
    minutes = { "5m", 300 },
    hours = { "2h", 7200 },
    days = { "1d", 86_400 },
)]
fn intervals_parse(input: &str, secs: u64) {
    assert_eq!(parse_interval(input), Ok(Duration::from_secs(secs)));
}

#[parameterized(
    empty = { "" },
    words = { "soon" },
    bad_suffix = { "5y" },
)]
fn bad_intervals_are_errors(input: &str) {
    assert!(parse_interval(input).is_err());
}

#[test]
fn load_skips_unparseable_definitions() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("ci.json"),
        r#"{"name":"ci","interval":"5m","path":"/tmp/proj","skills":["build"]}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.json"), "{nope").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let defs = load_heartbeats(dir.path());
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name, "ci");
    assert_eq!(defs[0].skills, ["build"]);
}

#[test]
fn load_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    assert!(load_heartbeats(&dir.path().join("nope")).is_empty());
}

struct HbHarness {
    dir: TempDir,
    store: SessionStore,
    runner: HeartbeatRunner,
}

/// Storage root with one tool-only skill (no LLM turn needed) and one
/// heartbeat definition pointing at it.
fn hb_harness(interval: &str) -> HbHarness {
    let dir = TempDir::new().unwrap();
    let skill_dir = dir.path().join("skills").join("tick");
    std::fs::create_dir_all(&skill_dir).unwrap();
    std::fs::write(
        skill_dir.join("skill.json"),
        r#"{
            "skill_name": "tick",
            "initial_state": "touch",
            "states": {
                "touch": { "type": "tool", "command": "true", "next": "done" },
                "done": { "type": "end" }
            }
        }"#,
    )
    .unwrap();

    let bus = EventBus::new();
    let store = SessionStore::new(dir.path(), bus.clone());
    let drivers = DriverRegistry::new();
    drivers.register(Arc::new(FakeDriver::new()));
    let engine = Engine::new(store.clone(), bus, drivers, 5);

    let defs = vec![HeartbeatDef {
        name: "ci".to_string(),
        interval: interval.to_string(),
        path: dir.path().to_path_buf(),
        skills: vec!["tick".to_string()],
    }];
    let loader = SkillLoader::new(dir.path());
    let runner = HeartbeatRunner::new(engine, loader, "claude", defs);
    HbHarness { dir, store, runner }
}

#[tokio::test]
async fn due_heartbeat_runs_skill_in_an_ephemeral_session() {
    let h = hb_harness("1h");

    let fired = h.runner.run_due(Instant::now()).await;
    assert_eq!(fired, 1);

    let session = h.store.latest_by_title("heartbeat:ci").unwrap().unwrap();
    assert!(session.ephemeral);
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.cwd, h.dir.path());

    // Hidden from user-visible listings.
    let (_, total) = h.store.list(0, 10, false).unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn heartbeat_respects_its_interval() {
    let h = hb_harness("1h");
    let now = Instant::now();

    assert_eq!(h.runner.run_due(now).await, 1);
    assert_eq!(h.runner.run_due(now + Duration::from_secs(60)).await, 0);
    assert_eq!(h.runner.run_due(now + Duration::from_secs(3601)).await, 1);
}

#[tokio::test]
async fn heartbeat_reuses_its_session() {
    let h = hb_harness("1s");
    let now = Instant::now();

    h.runner.run_due(now).await;
    h.runner.run_due(now + Duration::from_secs(2)).await;

    let (entries, _) = h.store.list(0, 10, true).unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn blocked_session_is_skipped() {
    let h = hb_harness("1s");
    let now = Instant::now();

    h.runner.run_due(now).await;
    let mut session = h.store.latest_by_title("heartbeat:ci").unwrap().unwrap();
    session.status = SessionStatus::InterventionRequired;
    h.store.save(&mut session).unwrap();

    // The tick fires but must not touch the blocked session.
    h.runner.run_due(now + Duration::from_secs(2)).await;
    let after = h.store.latest_by_title("heartbeat:ci").unwrap().unwrap();
    assert_eq!(after.status, SessionStatus::InterventionRequired);
}

#[tokio::test]
async fn disabled_skill_is_skipped() {
    let h = hb_harness("1h");
    std::fs::write(
        h.dir.path().join("skills_registry.json"),
        r#"{"tick": false}"#,
    )
    .unwrap();

    h.runner.run_due(Instant::now()).await;
    let session = h.store.latest_by_title("heartbeat:ci").unwrap().unwrap();
    // The session exists but no skill ran.
    assert_eq!(session.status, SessionStatus::Idle);
}
