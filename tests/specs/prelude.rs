//! Shared harness for the spec suite.

use gantry_bus::{EventBus, Subscription};
use gantry_core::{AuditEntry, Event, Session};
use gantry_drivers::{DriverRegistry, FakeDriver};
use gantry_engine::{Engine, InterventionAction};
use gantry_skill::{SkillGraph, StateDef, StateType};
use gantry_store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

pub struct Harness {
    pub dir: TempDir,
    pub store: SessionStore,
    pub bus: EventBus,
    pub driver: FakeDriver,
    pub engine: Engine,
}

pub fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let bus = EventBus::new();
    let store = SessionStore::new(dir.path(), bus.clone());
    let driver = FakeDriver::new();
    let drivers = DriverRegistry::new();
    drivers.register(Arc::new(driver.clone()));
    let engine = Engine::new(store.clone(), bus.clone(), drivers, 5);
    Harness {
        dir,
        store,
        bus,
        driver,
        engine,
    }
}

impl Harness {
    pub fn session(&self) -> Session {
        self.store
            .create(self.dir.path(), "spec session", "claude")
            .unwrap()
    }

    pub fn audit(&self, session_id: Uuid) -> Vec<AuditEntry> {
        let session = self.store.load(session_id).unwrap();
        self.store.last_audit(&session, 200).unwrap()
    }
}

pub fn action_state(instruction: &str, verify_cmd: &str, next: &str) -> StateDef {
    StateDef {
        state_type: StateType::ActionLoop,
        role: "default".to_string(),
        instruction: instruction.to_string(),
        verify_cmd: verify_cmd.to_string(),
        next: next.to_string(),
        ..StateDef::default()
    }
}

pub fn tool_state(command: &str, next: &str) -> StateDef {
    StateDef {
        state_type: StateType::Tool,
        command: command.to_string(),
        next: next.to_string(),
        ..StateDef::default()
    }
}

pub fn end_state() -> StateDef {
    StateDef {
        state_type: StateType::End,
        ..StateDef::default()
    }
}

pub fn graph(
    name: &str,
    initial: &str,
    max_loops: u32,
    states: Vec<(&str, StateDef)>,
) -> SkillGraph {
    SkillGraph {
        skill_name: name.to_string(),
        initial_state: initial.to_string(),
        max_loops,
        states: states
            .into_iter()
            .map(|(n, s)| (n.to_string(), s))
            .collect(),
    }
}

/// Wait for the next `task_blocked` event on a subscription.
pub async fn next_blocked(sub: &mut Subscription) -> (Uuid, String) {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), sub.recv()).await {
            Ok(Some(Event::TaskBlocked {
                session_id, node, ..
            })) => return (session_id, node),
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => panic!("no task_blocked event arrived"),
        }
    }
}

/// Resolve an intervention, retrying until the engine's waiter appears.
pub async fn resolve_soon(engine: &Engine, id: Uuid, action: InterventionAction) {
    for _ in 0..500 {
        if engine.resolve_intervention(id, action) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("no intervention waiter appeared for {}", id);
}
