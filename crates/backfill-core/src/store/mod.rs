//! Persistent cursor storage.
//!
//! Cursors are plain `i64` positions keyed by a namespaced string. The
//! engine only needs get, put and forget; backends choose their own
//! durability and decide what `flush` means.

mod memory;
mod sled_store;

pub use memory::MemoryCursorStore;
pub use sled_store::SledCursorStore;

use crate::error::Result;

/// Key-value store backing migration cursors.
pub trait CursorStore: Send + Sync {
    /// Read the position stored under `key`.
    fn get(&self, key: &str) -> Result<Option<i64>>;

    /// Store `position` under `key`.
    fn put(&self, key: &str, position: i64) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn forget(&self, key: &str) -> Result<()>;

    /// Make previous writes durable.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
