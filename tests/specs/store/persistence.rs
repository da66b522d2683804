//! Cross-component persistence behavior: sessions survive reload, audit
//! appends publish on the bus, archives are idempotent.

use crate::prelude::*;
use gantry_bus::EventBus;
use gantry_core::{AuditEntry, AuditKind, Event, SessionStatus};
use gantry_store::SessionStore;
use tempfile::TempDir;

#[test]
fn a_second_store_on_the_same_root_sees_the_session() {
    let dir = TempDir::new().unwrap();
    let store_a = SessionStore::new(dir.path(), EventBus::new());
    let mut session = store_a.create("/tmp/proj", "shared", "claude").unwrap();
    session.status = SessionStatus::Running;
    session.pending_feedback = "carry me".to_string();
    store_a.save(&mut session).unwrap();

    let store_b = SessionStore::new(dir.path(), EventBus::new());
    let loaded = store_b.load(session.id).unwrap();
    assert_eq!(loaded.pending_feedback, "carry me");
    assert_eq!(loaded.status, SessionStatus::Running);
}

#[test]
fn archive_is_idempotent_and_preserves_the_audit_trail() {
    let h = harness();
    let session = h.session();
    h.store
        .append_audit(
            &session,
            &AuditEntry::new(AuditKind::Info, "engine", "before archive"),
        )
        .unwrap();

    h.store.archive(session.id).unwrap();
    h.store.archive(session.id).unwrap();

    let archived = h.store.load(session.id).unwrap();
    assert!(archived.archived);
    let tail = h.store.last_audit(&archived, 10).unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].content, "before archive");
}

#[tokio::test]
async fn audit_appends_reach_bus_subscribers() {
    let h = harness();
    let mut sub = h.bus.subscribe();
    let session = h.session();
    h.store
        .append_audit(
            &session,
            &AuditEntry::new(AuditKind::Info, "engine", "published"),
        )
        .unwrap();

    loop {
        match sub.try_recv() {
            Some(Event::Audit { session_id, entry }) => {
                assert_eq!(session_id, session.id);
                assert_eq!(entry.content, "published");
                break;
            }
            Some(_) => continue,
            None => panic!("audit event was not published"),
        }
    }
}

#[test]
fn engine_runs_are_recoverable_from_the_index_after_restart() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path(), EventBus::new());
    for i in 0..3 {
        store
            .create("/tmp/proj", format!("s{}", i), "claude")
            .unwrap();
    }

    // A fresh process (new store) lists the same sessions, newest first.
    let fresh = SessionStore::new(dir.path(), EventBus::new());
    let (entries, total) = fresh.list(0, 10, false).unwrap();
    assert_eq!(total, 3);
    assert_eq!(entries[0].title, "s2");
    assert_eq!(entries[2].title, "s0");
}
