// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gantry_core::ApprovalMode;

fn opts(prompt: &str) -> RunOptions {
    RunOptions {
        native_session_id: None,
        prompt: prompt.to_string(),
        cwd: "/tmp".into(),
        approval: ApprovalMode::Plan,
        yolo: false,
        model_tier: None,
        budget_usd: 0.0,
    }
}

#[tokio::test]
async fn plays_back_scripted_runs_in_order() {
    let driver = FakeDriver::new();
    driver.push_run(ScriptedRun::streaming("n-1", &["a", "b"]));
    driver.push_run(ScriptedRun::text("second"));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let first = driver.run(opts("one"), tx).await.unwrap();
    assert_eq!(first, "ab");
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    assert_eq!(events.len(), 3);

    let (tx, _rx) = mpsc::unbounded_channel();
    let second = driver.run(opts("two"), tx).await.unwrap();
    assert_eq!(second, "second");
}

#[tokio::test]
async fn records_calls() {
    let driver = FakeDriver::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    driver.run(opts("remember me"), tx).await.unwrap();

    let calls = driver.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, "remember me");
}

#[tokio::test]
async fn scripted_error_is_returned() {
    let driver = FakeDriver::new();
    driver.push_run(ScriptedRun::failing("backend unavailable"));
    let (tx, _rx) = mpsc::unbounded_channel();
    let err = driver.run(opts("x"), tx).await.unwrap_err();
    assert!(err.to_string().contains("backend unavailable"));
}

#[tokio::test]
async fn exhausted_script_returns_empty_success() {
    let driver = FakeDriver::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    assert_eq!(driver.run(opts("x"), tx).await.unwrap(), "");
}
