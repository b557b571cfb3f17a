//! In-memory cursor store.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::CursorStore;
use crate::error::Result;

/// Cursor store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    positions: RwLock<HashMap<String, i64>>,
}

impl MemoryCursorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cursors.
    pub fn len(&self) -> usize {
        self.positions.read().len()
    }

    /// Check whether the store holds no cursors.
    pub fn is_empty(&self) -> bool {
        self.positions.read().is_empty()
    }
}

impl CursorStore for MemoryCursorStore {
    fn get(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.positions.read().get(key).copied())
    }

    fn put(&self, key: &str, position: i64) -> Result<()> {
        self.positions.write().insert(key.to_string(), position);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        self.positions.write().remove(key);
        Ok(())
    }
}
