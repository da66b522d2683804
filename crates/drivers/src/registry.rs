// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name → driver map, populated by explicit registration at startup.

use crate::AgentDriver;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Holds the drivers an application registered at startup. Sessions select
/// a driver by backend name.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: Arc<RwLock<HashMap<String, Arc<dyn AgentDriver>>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its own name. Later registrations replace
    /// earlier ones.
    pub fn register(&self, driver: Arc<dyn AgentDriver>) {
        let name = driver.name().to_string();
        tracing::debug!(driver = %name, "registering agent driver");
        self.drivers.write().insert(name, driver);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentDriver>> {
        self.drivers.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
