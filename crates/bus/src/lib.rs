// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! In-process pub/sub fanning engine events out to interface adapters.
//!
//! Each subscriber gets a bounded buffer; a publisher waits a bounded
//! interval for a full subscriber, then drops the event for that
//! subscriber only. The audit log is the canonical record; adapters that
//! need completeness re-read it. A small rolling history is replayed to
//! new subscribers so late-attaching adapters see recent context.

use gantry_core::Event;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Buffered events per subscriber.
pub const SUBSCRIBER_BUFFER: usize = 100;

/// How long `publish` waits on one full subscriber before dropping.
pub const PUBLISH_WAIT: Duration = Duration::from_millis(10);

/// Events replayed to a new subscriber.
pub const REPLAY_HISTORY: usize = 10;

struct SubscriberSlot {
    id: u64,
    tx: mpsc::Sender<Event>,
}

struct BusInner {
    next_id: u64,
    subscribers: Vec<SubscriberSlot>,
    history: VecDeque<Event>,
    dropped: u64,
}

/// Handle to a bus subscription. Receive with [`Subscription::recv`];
/// dropping the handle (or calling [`EventBus::unsubscribe`]) detaches it.
pub struct Subscription {
    pub id: u64,
    rx: mpsc::Receiver<Event>,
}

impl Subscription {
    /// Next event, or `None` once detached and drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Non-blocking variant for polling adapters.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

/// Many-publisher, many-subscriber event bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                next_id: 0,
                subscribers: Vec::new(),
                history: VecDeque::with_capacity(REPLAY_HISTORY),
                dropped: 0,
            })),
        }
    }

    /// Attach a new subscriber and replay the rolling history into it.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut inner = self.inner.lock();
        for event in &inner.history {
            // History is far smaller than the buffer; a failure here means
            // the subscriber vanished before we returned it.
            let _ = tx.try_send(event.clone());
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(SubscriberSlot { id, tx });
        Subscription { id, rx }
    }

    /// Detach a subscriber eagerly so publishers stop paying its wait.
    pub fn unsubscribe(&self, id: u64) {
        self.inner.lock().subscribers.retain(|s| s.id != id);
    }

    /// Deliver an event to every subscriber.
    ///
    /// The inner lock is held for the whole delivery; this is the single
    /// serialization point that gives per-publisher FIFO to each
    /// subscriber. A full subscriber is retried for up to [`PUBLISH_WAIT`]
    /// and then skipped.
    pub fn publish(&self, event: Event) {
        let mut inner = self.inner.lock();
        if inner.history.len() == REPLAY_HISTORY {
            inner.history.pop_front();
        }
        inner.history.push_back(event.clone());

        let mut closed = Vec::new();
        let mut dropped = 0u64;
        for slot in &inner.subscribers {
            match deliver(&slot.tx, event.clone()) {
                Delivery::Sent => {}
                Delivery::Dropped => dropped += 1,
                Delivery::Closed => closed.push(slot.id),
            }
        }
        if dropped > 0 {
            inner.dropped += dropped;
            tracing::debug!(dropped, "event dropped for slow subscribers");
        }
        if !closed.is_empty() {
            inner.subscribers.retain(|s| !closed.contains(&s.id));
        }
    }

    /// Total events dropped across all subscribers since creation.
    pub fn dropped_events(&self) -> u64 {
        self.inner.lock().dropped
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

enum Delivery {
    Sent,
    Dropped,
    Closed,
}

fn deliver(tx: &mpsc::Sender<Event>, event: Event) -> Delivery {
    let mut event = event;
    let deadline = Instant::now() + PUBLISH_WAIT;
    loop {
        match tx.try_send(event) {
            Ok(()) => return Delivery::Sent,
            Err(TrySendError::Closed(_)) => return Delivery::Closed,
            Err(TrySendError::Full(ev)) => {
                if Instant::now() >= deadline {
                    return Delivery::Dropped;
                }
                event = ev;
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
