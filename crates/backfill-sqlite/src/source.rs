//! SQLite table as a keyset source.
//!
//! Only rows whose key is stored as an INTEGER take part. Rows with a NULL,
//! TEXT, REAL or BLOB key are invisible to counts and fetches, so a table
//! with mixed key types is never partially migrated into a `MissingKey`
//! abort.

use std::rc::Rc;

use backfill_core::{KeyRange, Row, SourceQuery, Value};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use tracing::trace;

use crate::error::{quote_identifier, Result};

/// Rows of one SQLite table, keyed by an integer column.
pub struct SqliteSource {
    conn: Rc<Connection>,
    table: String,
    key: String,
    count_all: String,
    count_at_most: String,
    count_after: String,
    fetch: String,
}

impl SqliteSource {
    /// Create a source over `table` keyed by `key`.
    pub fn new(conn: Rc<Connection>, table: &str, key: &str) -> Result<Self> {
        let quoted_table = quote_identifier(table)?;
        let quoted_key = quote_identifier(key)?;
        let keyed = format!("typeof({}) = 'integer'", quoted_key);

        Ok(Self {
            conn,
            table: table.to_string(),
            key: key.to_string(),
            count_all: format!("SELECT COUNT(*) FROM {} WHERE {}", quoted_table, keyed),
            count_at_most: format!(
                "SELECT COUNT(*) FROM {} WHERE {} AND {} <= ?1",
                quoted_table, keyed, quoted_key
            ),
            count_after: format!(
                "SELECT COUNT(*) FROM {} WHERE {} AND {} > ?1",
                quoted_table, keyed, quoted_key
            ),
            fetch: format!(
                "SELECT * FROM {} WHERE {} AND {} > ?1 ORDER BY {} ASC LIMIT ?2",
                quoted_table, keyed, quoted_key, quoted_key
            ),
        })
    }

    /// Source table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Key column name.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn count_rows(&self, range: KeyRange) -> Result<u64> {
        let count: i64 = match range {
            KeyRange::All => self.conn.query_row(&self.count_all, [], |r| r.get(0))?,
            KeyRange::AtMost(bound) => self.conn.query_row(&self.count_at_most, params![bound], |r| r.get(0))?,
            KeyRange::After(bound) => self.conn.query_row(&self.count_after, params![bound], |r| r.get(0))?,
        };
        Ok(count.max(0) as u64)
    }

    fn fetch_rows(&self, after: i64, limit: usize) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare_cached(&self.fetch)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = stmt.query(params![after, limit])?;
        let mut out = Vec::new();

        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, name) in names.iter().enumerate() {
                record.push(name.as_str(), to_value(row.get_ref(i)?));
            }
            out.push(record);
        }

        trace!(table = %self.table, after, rows = out.len(), "fetched rows");
        Ok(out)
    }
}

fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Blob(v.to_vec()),
    }
}

impl SourceQuery for SqliteSource {
    fn count(&self, range: KeyRange) -> backfill_core::Result<u64> {
        Ok(self.count_rows(range)?)
    }

    fn fetch_after(&self, after: i64, limit: usize) -> backfill_core::Result<Vec<Row>> {
        Ok(self.fetch_rows(after, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_users() -> Rc<Connection> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE legacy_users (id INTEGER PRIMARY KEY, email TEXT, score REAL, avatar BLOB);
            INSERT INTO legacy_users VALUES (3, 'c@example.com', 1.5, NULL);
            INSERT INTO legacy_users VALUES (1, 'a@example.com', NULL, x'0102');
            INSERT INTO legacy_users VALUES (7, 'g@example.com', 2.0, NULL);
            INSERT INTO legacy_users VALUES (5, NULL, NULL, NULL);
            "#,
        )
        .unwrap();
        Rc::new(conn)
    }

    #[test]
    fn test_counts() {
        let source = SqliteSource::new(legacy_users(), "legacy_users", "id").unwrap();
        assert_eq!(source.count(KeyRange::All).unwrap(), 4);
        assert_eq!(source.count(KeyRange::AtMost(3)).unwrap(), 2);
        assert_eq!(source.count(KeyRange::After(3)).unwrap(), 2);
        assert_eq!(source.count(KeyRange::After(7)).unwrap(), 0);
    }

    #[test]
    fn test_fetch_after_keyset() {
        let source = SqliteSource::new(legacy_users(), "legacy_users", "id").unwrap();

        let first = source.fetch_after(0, 2).unwrap();
        let keys: Vec<i64> = first.iter().filter_map(|r| r.key("id")).collect();
        assert_eq!(keys, vec![1, 3]);
        assert_eq!(first[0].get("avatar"), Some(&Value::Blob(vec![1, 2])));
        assert_eq!(first[1].get("score"), Some(&Value::Real(1.5)));

        let second = source.fetch_after(3, 10).unwrap();
        let keys: Vec<i64> = second.iter().filter_map(|r| r.key("id")).collect();
        assert_eq!(keys, vec![5, 7]);
        assert_eq!(second[0].get("email"), Some(&Value::Null));
    }

    #[test]
    fn test_non_integer_keys_are_excluded() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE legacy_events (event_id, payload TEXT);
            INSERT INTO legacy_events VALUES (1, 'first');
            INSERT INTO legacy_events VALUES (NULL, 'orphan');
            INSERT INTO legacy_events VALUES ('abc', 'text key');
            INSERT INTO legacy_events VALUES (2.5, 'real key');
            INSERT INTO legacy_events VALUES (4, 'second');
            "#,
        )
        .unwrap();
        let source = SqliteSource::new(Rc::new(conn), "legacy_events", "event_id").unwrap();

        assert_eq!(source.count(KeyRange::All).unwrap(), 2);
        assert_eq!(source.count(KeyRange::AtMost(1)).unwrap(), 1);
        assert_eq!(source.count(KeyRange::After(1)).unwrap(), 1);
        assert_eq!(source.count(KeyRange::After(4)).unwrap(), 0);

        let keys: Vec<i64> = source
            .fetch_after(0, 10)
            .unwrap()
            .iter()
            .filter_map(|r| r.key("event_id"))
            .collect();
        assert_eq!(keys, vec![1, 4]);
        assert!(source.fetch_after(4, 10).unwrap().is_empty());
    }

    #[test]
    fn test_missing_table_is_query_error() {
        let source = SqliteSource::new(legacy_users(), "nope", "id").unwrap();
        assert!(matches!(
            source.count(KeyRange::All),
            Err(backfill_core::Error::Query(_))
        ));
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        assert!(SqliteSource::new(legacy_users(), "users--", "id").is_err());
        assert!(SqliteSource::new(legacy_users(), "legacy_users", "").is_err());
    }
}
