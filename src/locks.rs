//! Per-key mutual exclusion.
//!
//! `KeyedLocks` hands out one mutex per resource key (a collection name or a normalized
//! file path). Holders of different keys never contend; holders of the same key are
//! serialized. A slot lives in the map only while somebody holds or waits on it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Guard for one key. Dropping it releases the key and reclaims the slot when idle.
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl KeyedLocks {
    pub fn new() -> Self { Self::default() }

    /// Block until `key` is free and take it.
    pub fn lock(&self, key: &str) -> KeyGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let guard = slot.lock_arc();
        KeyGuard { owner: self, key: key.to_string(), guard: Some(guard) }
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize { self.slots.lock().len() }
}

impl KeyGuard<'_> {
    pub fn key(&self) -> &str { &self.key }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.owner.slots.lock();
        drop(self.guard.take());
        // Only the map's own reference left: nobody holds or waits on this key.
        let idle = slots.get(&self.key).map(|s| Arc::strong_count(s) == 1).unwrap_or(false);
        if idle {
            slots.remove(&self.key);
        }
    }
}
