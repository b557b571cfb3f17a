//! sled-backed cursor store.

use std::path::Path;

use super::CursorStore;
use crate::error::{Error, Result};

/// Cursor store persisted in a sled tree.
///
/// Positions are stored as 8-byte big-endian integers.
pub struct SledCursorStore {
    tree: sled::Tree,
}

impl SledCursorStore {
    /// Tree name for cursor positions.
    pub const TREE_NAME: &'static str = "backfill:cursors";

    /// Open or create the cursor store in an existing database.
    pub fn open(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree(Self::TREE_NAME)?;
        Ok(Self { tree })
    }

    /// Open or create a database at `path` and the cursor store within it.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Self::open(&db)
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<i64> {
    let bytes: [u8; 8] = bytes.try_into().map_err(|_| {
        Error::Deserialization(format!(
            "cursor {} holds {} bytes, expected 8",
            key,
            bytes.len()
        ))
    })?;
    Ok(i64::from_be_bytes(bytes))
}

impl CursorStore for SledCursorStore {
    fn get(&self, key: &str) -> Result<Option<i64>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, position: i64) -> Result<()> {
        self.tree
            .insert(key.as_bytes(), position.to_be_bytes().to_vec())?;
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        self.tree.remove(key.as_bytes())?;
        self.tree.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.tree.flush()?;
        Ok(())
    }
}
