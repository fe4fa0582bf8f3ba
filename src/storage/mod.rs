//!
//! folio-admin storage module
//! ---------------------------
//! Key-value persistence beneath the collection store. A backend maps a key (the
//! collection name) to one opaque document. Writers always replace the whole document,
//! so readers observe either the previous or the next version and never a mix.
//!
//! Two backends ship with the crate:
//! - `JsonFileBackend`: one `<key>.json` file per key under a data directory, replaced
//!   through a temp file and an atomic rename.
//! - `MemoryBackend`: a map held in process, used by tests and ephemeral runs.
//!
//! The rest of the codebase holds backends as `SharedBackend` (`Arc<dyn SnapshotBackend>`).

use std::sync::Arc;

use crate::error::{AppError, AppResult};

mod json_file;
mod memory;

pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;

/// Whole-document persistence keyed by name.
pub trait SnapshotBackend: Send + Sync {
    /// Load the document stored under `key`, or `None` when nothing was ever stored.
    fn load(&self, key: &str) -> AppResult<Option<Vec<u8>>>;
    /// Replace the document stored under `key`.
    fn store(&self, key: &str, bytes: &[u8]) -> AppResult<()>;
    /// Short backend label for logs.
    fn describe(&self) -> String;
}

pub type SharedBackend = Arc<dyn SnapshotBackend>;

/// Backend keys end up in file names; allow a conservative alphabet only.
pub fn validate_key(key: &str) -> AppResult<()> {
    let ok = !key.is_empty()
        && key.len() <= 64
        && key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(AppError::invalid_input("invalid_key".to_string(), format!("invalid storage key '{key}'")))
    }
}
