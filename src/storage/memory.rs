use std::collections::HashMap;

use parking_lot::RwLock;

use super::{validate_key, SnapshotBackend};
use crate::error::AppResult;

/// In-process documents; contents vanish with the process.
#[derive(Default)]
pub struct MemoryBackend {
    docs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }
}

impl SnapshotBackend for MemoryBackend {
    fn load(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.docs.read().get(key).cloned())
    }

    fn store(&self, key: &str, bytes: &[u8]) -> AppResult<()> {
        validate_key(key)?;
        self.docs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String { "memory".to_string() }
}
