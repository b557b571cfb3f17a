//! Persisted scan position of a migration unit.
//!
//! A cursor remembers the key of the last source row a unit dequeued. Rows
//! with a key at or below the cursor are considered migrated; rows above it
//! are still to do.
//!
//! Reads fail closed: if the store cannot be read the cursor reports 0 and
//! the unit rescans from the start, relying on idempotent writes. Writes
//! and deletes propagate store errors to the caller.

use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::store::CursorStore;

/// Persisted cursor for one migration unit.
pub struct Cursor {
    name: String,
    key: String,
    store: Arc<dyn CursorStore>,
    enabled: bool,
}

impl Cursor {
    /// Create a cursor named `name` stored under `key`.
    pub fn new(name: impl Into<String>, key: impl Into<String>, store: Arc<dyn CursorStore>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            store,
            enabled: true,
        }
    }

    /// The owning unit's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current position, or 0 if disabled, unset or unreadable.
    pub fn get(&self) -> i64 {
        if !self.enabled {
            return 0;
        }

        match self.store.get(&self.key) {
            Ok(position) => position.unwrap_or(0),
            Err(e) => {
                warn!(cursor = %self.key, error = %e, "cursor read failed, scanning from start");
                0
            }
        }
    }

    /// Persist `position`. Does nothing when disabled.
    pub fn set(&self, position: i64) -> Result<()> {
        if self.enabled {
            self.store.put(&self.key, position)?;
        }
        Ok(())
    }

    /// Delete the persisted position so the next read yields 0.
    pub fn rewind(&self) -> Result<()> {
        self.store.forget(&self.key)
    }

    /// Freeze the cursor at 0 and ignore writes.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Check whether the cursor is disabled.
    pub fn is_disabled(&self) -> bool {
        !self.enabled
    }

    /// Flush the backing store.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    pub(crate) fn rekey(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("enabled", &self.enabled)
            .finish()
    }
}
