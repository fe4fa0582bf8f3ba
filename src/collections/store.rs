use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::item::{CollectionSnapshot, ContentItem, Direction, ItemPayload};
use super::ordering;
use crate::error::{AppError, AppResult};
use crate::locks::KeyedLocks;
use crate::storage::{validate_key, SharedBackend};

/// A mutation request in wire form. Payloads and patches stay JSON until the typed
/// store parses them, so one enum serves every collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Add { payload: Value },
    Reorder { id: String, direction: Direction },
    ToggleVisibility { id: String },
    Delete { id: String },
    Update { id: String, patch: Map<String, Value> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Changed,
    Unchanged,
}

/// Ordered, visibility-gated collection persisted as whole snapshots.
///
/// Mutations on one collection name are serialized through the shared `KeyedLocks`;
/// each runs load -> mutate a working copy -> persist the full snapshot. The working
/// copy is dropped on any error, so a failed mutation leaves the backend untouched.
pub struct OrderedCollectionStore<P: ItemPayload> {
    name: String,
    backend: SharedBackend,
    locks: Arc<KeyedLocks>,
    _payload: PhantomData<fn() -> P>,
}

impl<P: ItemPayload> OrderedCollectionStore<P> {
    pub fn new(name: &str, backend: SharedBackend, locks: Arc<KeyedLocks>) -> AppResult<Self> {
        validate_key(name)?;
        Ok(Self { name: name.to_string(), backend, locks, _payload: PhantomData })
    }

    pub fn name(&self) -> &str { &self.name }

    /// Current snapshot, items sorted by `order`.
    pub fn snapshot(&self) -> AppResult<CollectionSnapshot<P>> {
        let Some(bytes) = self.backend.load(&self.name)? else {
            return Ok(CollectionSnapshot::default());
        };
        let mut snap: CollectionSnapshot<P> = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::io("corrupt_snapshot".to_string(), format!("collection '{}' snapshot unreadable: {e}", self.name))
        })?;
        ordering::sort_by_order(&mut snap.items);
        if !ordering::is_dense(&snap.items) {
            warn!(target: "folio_admin::collections", "collection '{}' has non-dense order values; renumbering view", self.name);
            ordering::renumber(&mut snap.items);
        }
        Ok(snap)
    }

    pub fn list(&self) -> AppResult<Vec<ContentItem<P>>> {
        Ok(self.snapshot()?.items)
    }

    pub fn add(&self, payload: P, visible: Option<bool>) -> AppResult<Vec<ContentItem<P>>> {
        payload.validate()?;
        Ok(self.mutate(None, |items| Ok(push_item(items, payload, visible)))?.items)
    }

    pub fn reorder(&self, id: &str, direction: Direction) -> AppResult<Vec<ContentItem<P>>> {
        Ok(self.mutate(None, |items| reorder_item(items, id, direction))?.items)
    }

    pub fn toggle_visibility(&self, id: &str) -> AppResult<Vec<ContentItem<P>>> {
        Ok(self.mutate(None, |items| toggle_item(items, id))?.items)
    }

    pub fn delete(&self, id: &str) -> AppResult<Vec<ContentItem<P>>> {
        Ok(self.mutate(None, |items| delete_item(items, id))?.items)
    }

    pub fn update(&self, id: &str, patch: &Map<String, Value>) -> AppResult<Vec<ContentItem<P>>> {
        Ok(self.mutate(None, |items| patch_item(items, id, patch))?.items)
    }

    /// Apply a wire-form mutation, optionally guarded by the revision the caller last saw.
    pub fn apply(&self, mutation: Mutation, expected_revision: Option<u64>) -> AppResult<CollectionSnapshot<P>> {
        match mutation {
            Mutation::Add { payload } => {
                let (payload, visible) = parse_new_item::<P>(payload)?;
                self.mutate(expected_revision, |items| Ok(push_item(items, payload, visible)))
            }
            Mutation::Reorder { id, direction } => self.mutate(expected_revision, |items| reorder_item(items, &id, direction)),
            Mutation::ToggleVisibility { id } => self.mutate(expected_revision, |items| toggle_item(items, &id)),
            Mutation::Delete { id } => self.mutate(expected_revision, |items| delete_item(items, &id)),
            Mutation::Update { id, patch } => self.mutate(expected_revision, |items| patch_item(items, &id, &patch)),
        }
    }

    fn mutate<F>(&self, expected_revision: Option<u64>, f: F) -> AppResult<CollectionSnapshot<P>>
    where
        F: FnOnce(&mut Vec<ContentItem<P>>) -> AppResult<Outcome>,
    {
        let _guard = self.locks.lock(&self.name);
        let mut snap = self.snapshot()?;
        if let Some(expected) = expected_revision {
            if expected != snap.revision {
                return Err(AppError::conflict(
                    "revision_mismatch".to_string(),
                    format!("collection '{}' is at revision {}, request expected {}", self.name, snap.revision, expected),
                ));
            }
        }
        if f(&mut snap.items)? == Outcome::Unchanged {
            debug!(target: "folio_admin::collections", "collection '{}' unchanged at revision {}", self.name, snap.revision);
            return Ok(snap);
        }
        ordering::renumber(&mut snap.items);
        snap.revision += 1;
        let bytes = serde_json::to_vec_pretty(&snap)
            .map_err(|e| AppError::internal("encode_snapshot".to_string(), e.to_string()))?;
        self.backend.store(&self.name, &bytes)?;
        debug!(target: "folio_admin::collections", "collection '{}' persisted revision={} items={}", self.name, snap.revision, snap.items.len());
        Ok(snap)
    }
}

fn item_not_found(id: &str) -> AppError {
    AppError::not_found("item_not_found".to_string(), format!("item '{id}' not found"))
}

fn locate<P>(items: &[ContentItem<P>], id: &str) -> AppResult<usize> {
    ordering::position(items, id).ok_or_else(|| item_not_found(id))
}

fn push_item<P>(items: &mut Vec<ContentItem<P>>, payload: P, visible: Option<bool>) -> Outcome {
    let order = items.len();
    items.push(ContentItem { id: Uuid::new_v4().to_string(), order, visible: visible.unwrap_or(true), payload });
    Outcome::Changed
}

fn reorder_item<P>(items: &mut [ContentItem<P>], id: &str, direction: Direction) -> AppResult<Outcome> {
    let index = locate(items, id)?;
    if ordering::step(items, index, direction) { Ok(Outcome::Changed) } else { Ok(Outcome::Unchanged) }
}

fn toggle_item<P>(items: &mut [ContentItem<P>], id: &str) -> AppResult<Outcome> {
    let index = locate(items, id)?;
    items[index].visible = !items[index].visible;
    Ok(Outcome::Changed)
}

fn delete_item<P>(items: &mut Vec<ContentItem<P>>, id: &str) -> AppResult<Outcome> {
    let index = locate(items, id)?;
    ordering::remove_at(items, index);
    Ok(Outcome::Changed)
}

fn invalid_payload(msg: String) -> AppError {
    AppError::invalid_input("invalid_payload".to_string(), msg)
}

/// Split an add request into the typed payload and the optional `visible` flag.
/// `id` and `order` are assigned by the store and ignored when supplied.
fn parse_new_item<P: ItemPayload>(value: Value) -> AppResult<(P, Option<bool>)> {
    let Value::Object(mut map) = value else {
        return Err(invalid_payload("payload must be a JSON object".to_string()));
    };
    let visible = match map.remove("visible") {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(b),
        Some(other) => return Err(invalid_payload(format!("'visible' must be a boolean, got {other}"))),
    };
    map.remove("id");
    map.remove("order");
    let payload: P = serde_json::from_value(Value::Object(map)).map_err(|e| invalid_payload(e.to_string()))?;
    payload.validate()?;
    Ok((payload, visible))
}

fn patch_item<P: ItemPayload>(items: &mut Vec<ContentItem<P>>, id: &str, patch: &Map<String, Value>) -> AppResult<Outcome> {
    let index = locate(items, id)?;
    if patch.contains_key("id") {
        return Err(AppError::invalid_input("immutable_field".to_string(), "'id' cannot be changed".to_string()));
    }
    let visible = match patch.get("visible") {
        None => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(other) => return Err(invalid_payload(format!("'visible' must be a boolean, got {other}"))),
    };
    let target = match patch.get("order") {
        None => None,
        Some(v) => match v.as_u64().map(|n| n as usize) {
            Some(n) if n < items.len() => Some(n),
            _ => return Err(AppError::invalid_input(
                "order_out_of_range".to_string(),
                format!("'order' must be an integer in 0..{}, got {v}", items.len()),
            )),
        },
    };

    let mut fields = match serde_json::to_value(&items[index].payload) {
        Ok(Value::Object(m)) => m,
        Ok(_) => return Err(AppError::internal("payload_shape".to_string(), "payload does not serialize to an object".to_string())),
        Err(e) => return Err(AppError::internal("payload_shape".to_string(), e.to_string())),
    };
    for (k, v) in patch {
        if k != "visible" && k != "order" {
            fields.insert(k.clone(), v.clone());
        }
    }
    let payload: P = serde_json::from_value(Value::Object(fields)).map_err(|e| invalid_payload(e.to_string()))?;
    payload.validate()?;

    // Validation is complete; nothing above touched the items.
    let before = items[index].clone();
    items[index].payload = payload;
    if let Some(v) = visible {
        items[index].visible = v;
    }
    let unchanged = items[index] == before && target.map(|t| t == index).unwrap_or(true);
    if let Some(t) = target {
        ordering::move_to(items, index, t);
    }
    Ok(if unchanged { Outcome::Unchanged } else { Outcome::Changed })
}
