//! SQLite destination row counter.

use std::rc::Rc;

use backfill_core::Destination;
use rusqlite::Connection;

use crate::error::{quote_identifier, Result};

/// Counts rows of destination tables in a SQLite database.
pub struct SqliteDestination {
    conn: Rc<Connection>,
}

impl SqliteDestination {
    /// Create a counter over `conn`.
    pub fn new(conn: Rc<Connection>) -> Self {
        Self { conn }
    }

    fn count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table)?);
        let count: i64 = self.conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(count.max(0) as u64)
    }
}

impl Destination for SqliteDestination {
    fn count_rows(&self, destination: &str) -> backfill_core::Result<u64> {
        Ok(self.count(destination)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_rows() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY); INSERT INTO users VALUES (1), (2);",
        )
        .unwrap();

        let destination = SqliteDestination::new(Rc::new(conn));
        assert_eq!(destination.count_rows("users").unwrap(), 2);
        assert!(destination.count_rows("orders").is_err());
    }
}
