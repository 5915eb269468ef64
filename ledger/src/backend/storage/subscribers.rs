//! Change-notification bookkeeping shared by the record sources.

use super::traits::SnapshotCallback;
use log::debug;
use shared::RawRecord;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    callbacks: BTreeMap<u64, (String, SnapshotCallback)>,
}

/// Callbacks registered per owner
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(inner: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
        inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, owner_id: &str, callback: SnapshotCallback) -> Subscription {
        let mut inner = Self::lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.callbacks.insert(id, (owner_id.to_string(), callback));
        debug!("Registered subscriber {} for owner {}", id, owner_id);

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Push a snapshot to every subscriber of `owner_id`; returns how many were called
    pub fn notify(&self, owner_id: &str, snapshot: &[RawRecord]) -> usize {
        // Callbacks run outside the lock so they may subscribe or unsubscribe
        let callbacks: Vec<SnapshotCallback> = Self::lock(&self.inner)
            .callbacks
            .values()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &callbacks {
            callback(snapshot.to_vec());
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self, owner_id: &str) -> usize {
        Self::lock(&self.inner)
            .callbacks
            .values()
            .filter(|(owner, _)| owner == owner_id)
            .count()
    }
}

/// Handle of a registered callback; dropping it unregisters the callback
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            SubscriberRegistry::lock(&registry).callbacks.remove(&self.id);
            debug!("Unregistered subscriber {}", self.id);
        }
    }
}
