//! Behavioral specifications for the gantry core.
//!
//! These tests drive the public crate APIs end-to-end with the scripted
//! fake driver and throwaway storage roots; no real agent binary or
//! network is involved. See tests/specs/prelude.rs for the shared
//! harness.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// engine/
#[path = "specs/engine/happy_path.rs"]
mod engine_happy_path;
#[path = "specs/engine/budgets.rs"]
mod engine_budgets;
#[path = "specs/engine/chain_of_thought.rs"]
mod engine_chain_of_thought;
#[path = "specs/engine/concurrency.rs"]
mod engine_concurrency;
#[path = "specs/engine/tools.rs"]
mod engine_tools;

// store/
#[path = "specs/store/persistence.rs"]
mod store_persistence;
