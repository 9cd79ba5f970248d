use std::sync::Arc;
use indexmap::IndexMap;

use crate::device::types::{Peripheral, PeripheralId};

/// Deduplicated, insertion-ordered set of the peripherals sighted in the current session.
///
/// Only the first sighting of an id is kept. Every insertion publishes a fresh immutable
/// snapshot, so readers holding an older snapshot are never affected by later mutation.
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: IndexMap<PeripheralId, Peripheral>,
    snapshot: Arc<[Peripheral]>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry {
            devices: IndexMap::new(),
            snapshot: Arc::from(Vec::new()),
        }
    }

    pub fn reset(&mut self) {
        self.devices.clear();
        self.snapshot = Arc::from(Vec::new());
    }

    /// Returns `true` if `peripheral` was not known yet.
    pub fn add(&mut self, peripheral: Peripheral) -> bool {
        if self.devices.contains_key(&peripheral.id) {
            return false;
        }

        self.devices.insert(peripheral.id.clone(), peripheral);
        self.snapshot = self.devices.values().cloned().collect();
        true
    }

    pub fn get(&self, id: &PeripheralId) -> Option<&Peripheral> {
        self.devices.get(id)
    }

    pub fn snapshot(&self) -> Arc<[Peripheral]> {
        Arc::clone(&self.snapshot)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        DeviceRegistry::new()
    }
}
