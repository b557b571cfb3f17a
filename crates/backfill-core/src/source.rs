//! Source query abstraction.
//!
//! A migration unit reads its legacy rows through [`SourceQuery`]: a source
//! that can be counted on either side of a key and streamed in ascending key
//! order after a key. This is all keyset pagination needs.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::row::Row;

/// Key filter for counting source rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRange {
    /// Every row.
    All,
    /// Rows with key `<=` the bound (already processed).
    AtMost(i64),
    /// Rows with key `>` the bound (still to process).
    After(i64),
}

impl KeyRange {
    /// Check whether a key falls within the range.
    pub fn contains(&self, key: i64) -> bool {
        match *self {
            KeyRange::All => true,
            KeyRange::AtMost(bound) => key <= bound,
            KeyRange::After(bound) => key > bound,
        }
    }
}

/// A countable, orderable, streamable row source.
pub trait SourceQuery {
    /// Count rows whose key falls in `range`.
    fn count(&self, range: KeyRange) -> Result<u64>;

    /// Fetch at most `limit` rows with key `> after`, in ascending key order.
    fn fetch_after(&self, after: i64, limit: usize) -> Result<Vec<Row>>;
}

/// In-memory source keyed by an integer column.
///
/// Rows can be appended while a unit holds a reference, which makes it
/// useful for exercising append-only concurrent writers.
pub struct MemorySource {
    key_name: String,
    rows: RwLock<BTreeMap<i64, Row>>,
}

impl MemorySource {
    /// Create an empty source keyed by `key_name`.
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a source from rows.
    pub fn with_rows(key_name: impl Into<String>, rows: impl IntoIterator<Item = Row>) -> Result<Self> {
        let source = Self::new(key_name);
        for row in rows {
            source.insert(row)?;
        }
        Ok(source)
    }

    /// Insert or replace a row by its key.
    pub fn insert(&self, row: Row) -> Result<()> {
        let key = row.key(&self.key_name).ok_or_else(|| {
            Error::Config(format!("row has no integer key field `{}`", self.key_name))
        })?;
        self.rows.write().insert(key, row);
        Ok(())
    }

    /// The key field name.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Number of rows held.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Check whether the source is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl SourceQuery for MemorySource {
    fn count(&self, range: KeyRange) -> Result<u64> {
        let rows = self.rows.read();
        let count = match range {
            KeyRange::All => rows.len(),
            KeyRange::AtMost(bound) => rows.range(..=bound).count(),
            KeyRange::After(bound) => rows.range((Excluded(bound), Unbounded)).count(),
        };
        Ok(count as u64)
    }

    fn fetch_after(&self, after: i64, limit: usize) -> Result<Vec<Row>> {
        let rows = self.rows.read();
        Ok(rows
            .range((Excluded(after), Unbounded))
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(keys: &[i64]) -> MemorySource {
        MemorySource::with_rows("id", keys.iter().map(|k| Row::new().with("id", *k))).unwrap()
    }

    #[test]
    fn test_count_partitions() {
        let source = source(&[1, 2, 3, 5, 8]);
        for cursor in [0, 1, 3, 4, 8, 9] {
            let skip = source.count(KeyRange::AtMost(cursor)).unwrap();
            let left = source.count(KeyRange::After(cursor)).unwrap();
            assert_eq!(skip + left, source.count(KeyRange::All).unwrap());
        }
        assert_eq!(source.count(KeyRange::AtMost(3)).unwrap(), 3);
        assert_eq!(source.count(KeyRange::After(3)).unwrap(), 2);
    }

    #[test]
    fn test_fetch_after_is_ordered_and_bounded() {
        let source = source(&[8, 1, 5, 3, 2]);
        let keys: Vec<i64> = source
            .fetch_after(1, 3)
            .unwrap()
            .iter()
            .filter_map(|row| row.key("id"))
            .collect();
        assert_eq!(keys, vec![2, 3, 5]);
        assert!(source.fetch_after(8, 10).unwrap().is_empty());
    }

    #[test]
    fn test_insert_requires_key() {
        let source = MemorySource::new("id");
        assert!(source.insert(Row::new().with("name", "x")).is_err());
        assert!(source.is_empty());
    }
}
