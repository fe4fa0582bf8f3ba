//!
//! folio-admin collections
//! ------------------------
//! Ordered, visibility-gated content collections (projects, services, feedback, users).
//!
//! Every collection is an `OrderedCollectionStore<P>` over its payload type. The store
//! keeps `order` a dense permutation of `0..N` across add/reorder/toggle/delete/update
//! and returns the full canonical list from every operation. `CollectionRegistry` maps
//! collection names to type-erased stores (`DynCollection`) for the HTTP layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::locks::KeyedLocks;
use crate::storage::SharedBackend;

pub mod item;
pub mod kinds;
pub mod ordering;
pub mod store;

pub use item::{CollectionSnapshot, ContentItem, Direction, ItemPayload};
pub use kinds::{FeedbackEntry, Project, Service, UserSession};
pub use store::{Mutation, OrderedCollectionStore};

/// Snapshot with items rendered as a JSON array.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSnapshot {
    pub revision: u64,
    pub items: Value,
}

/// Type-erased view of a collection store.
pub trait DynCollection: Send + Sync {
    fn name(&self) -> &str;
    fn snapshot_json(&self) -> AppResult<JsonSnapshot>;
    fn apply_json(&self, mutation: Mutation, expected_revision: Option<u64>) -> AppResult<JsonSnapshot>;
}

fn to_json<P: ItemPayload>(snap: CollectionSnapshot<P>) -> AppResult<JsonSnapshot> {
    let items = serde_json::to_value(&snap.items)
        .map_err(|e| AppError::internal("encode_items".to_string(), e.to_string()))?;
    Ok(JsonSnapshot { revision: snap.revision, items })
}

impl<P: ItemPayload> DynCollection for OrderedCollectionStore<P> {
    fn name(&self) -> &str { OrderedCollectionStore::name(self) }

    fn snapshot_json(&self) -> AppResult<JsonSnapshot> { to_json(self.snapshot()?) }

    fn apply_json(&self, mutation: Mutation, expected_revision: Option<u64>) -> AppResult<JsonSnapshot> {
        to_json(self.apply(mutation, expected_revision)?)
    }
}

/// Named collections sharing one backend and one lock table.
#[derive(Clone)]
pub struct CollectionRegistry {
    backend: SharedBackend,
    locks: Arc<KeyedLocks>,
    stores: BTreeMap<String, Arc<dyn DynCollection>>,
}

impl CollectionRegistry {
    pub fn new(backend: SharedBackend, locks: Arc<KeyedLocks>) -> Self {
        Self { backend, locks, stores: BTreeMap::new() }
    }

    /// Registry with the four collections the admin panel edits.
    pub fn with_defaults(backend: SharedBackend, locks: Arc<KeyedLocks>) -> AppResult<Self> {
        let mut reg = Self::new(backend, locks);
        reg.register::<Project>("projects")?;
        reg.register::<Service>("services")?;
        reg.register::<FeedbackEntry>("feedback")?;
        reg.register::<UserSession>("users")?;
        Ok(reg)
    }

    pub fn register<P: ItemPayload>(&mut self, name: &str) -> AppResult<()> {
        let store = OrderedCollectionStore::<P>::new(name, self.backend.clone(), self.locks.clone())?;
        self.stores.insert(name.to_string(), Arc::new(store));
        Ok(())
    }

    pub fn get(&self, name: &str) -> AppResult<Arc<dyn DynCollection>> {
        self.stores.get(name).cloned().ok_or_else(|| {
            AppError::not_found("collection_not_found".to_string(), format!("collection '{name}' not found"))
        })
    }

    pub fn names(&self) -> Vec<String> { self.stores.keys().cloned().collect() }
}
