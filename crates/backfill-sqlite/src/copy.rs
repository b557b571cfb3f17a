//! Column-copy migration between two SQLite databases.
//!
//! Each source row becomes one `INSERT .. ON CONFLICT DO NOTHING` into the
//! destination table. A row that is already present (by primary key or any
//! unique constraint) is reported as unchanged, so replaying a unit after a
//! rewind is harmless. NOT NULL and CHECK violations are not covered by the
//! conflict clause and fail the row.

use std::rc::Rc;

use backfill_core::{Migration, Row, RowError, RowOutcome, SourceQuery, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::error::{quote_identifier, Result};
use crate::source::SqliteSource;

/// Copies selected columns of a source table into a destination table.
pub struct CopyMigration {
    name: String,
    source: SqliteSource,
    target: Rc<Connection>,
    destination: String,
    quoted_destination: String,
    /// `(destination column, source column)` pairs. Empty copies every
    /// source column under its own name.
    columns: Vec<(String, String)>,
    depends_on: Vec<String>,
}

impl CopyMigration {
    /// Create a migration copying from `source` into `destination` in `target`.
    pub fn new(
        name: impl Into<String>,
        source: SqliteSource,
        target: Rc<Connection>,
        destination: &str,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            source,
            target,
            destination: destination.to_string(),
            quoted_destination: quote_identifier(destination)?,
            columns: Vec::new(),
            depends_on: Vec::new(),
        })
    }

    /// Map `source` column onto `destination` column.
    pub fn with_column(mut self, destination: &str, source: &str) -> Result<Self> {
        quote_identifier(destination)?;
        quote_identifier(source)?;
        self.columns.push((destination.to_string(), source.to_string()));
        Ok(self)
    }

    /// Run the named unit first.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    fn insert_sql(&self, columns: &[&str]) -> std::result::Result<String, RowError> {
        let quoted = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| RowError::new(e.to_string()))?;
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
            self.quoted_destination,
            quoted.join(", "),
            placeholders.join(", ")
        ))
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Blob(v) => SqlValue::Blob(v.clone()),
    }
}

impl Migration for CopyMigration {
    fn name(&self) -> &str {
        &self.name
    }

    fn destination(&self) -> &str {
        &self.destination
    }

    fn key_name(&self) -> &str {
        self.source.key()
    }

    fn source(&self) -> &dyn SourceQuery {
        &self.source
    }

    fn depends_on(&self) -> Vec<String> {
        self.depends_on.clone()
    }

    fn before(&mut self) -> backfill_core::Result<()> {
        let exists: i64 = self
            .target
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [&self.destination],
                |r| r.get(0),
            )
            .map_err(crate::Error::from)?;

        if exists == 0 {
            return Err(backfill_core::Error::Config(format!(
                "destination table {} does not exist",
                self.destination
            )));
        }

        debug!(unit = %self.name, source = %self.source.table(), destination = %self.destination, "copy starting");
        Ok(())
    }

    fn migrate(&mut self, row: &Row) -> std::result::Result<RowOutcome, RowError> {
        let (columns, values): (Vec<&str>, Vec<SqlValue>) = if self.columns.is_empty() {
            row.columns()
                .iter()
                .map(|(name, value)| (name.as_str(), to_sql(value)))
                .unzip()
        } else {
            let mut columns = Vec::with_capacity(self.columns.len());
            let mut values = Vec::with_capacity(self.columns.len());
            for (destination, source) in &self.columns {
                let value = row
                    .get(source)
                    .ok_or_else(|| RowError::new(format!("source row has no column {}", source)))?;
                columns.push(destination.as_str());
                values.push(to_sql(value));
            }
            (columns, values)
        };

        let sql = self.insert_sql(&columns)?;
        let mut stmt = self
            .target
            .prepare_cached(&sql)
            .map_err(|e| RowError::new(e.to_string()))?;
        let changed = stmt
            .execute(params_from_iter(values))
            .map_err(|e| RowError::new(e.to_string()))?;

        Ok(RowOutcome::from(changed > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn databases() -> (Rc<Connection>, Rc<Connection>) {
        let legacy = Connection::open_in_memory().unwrap();
        legacy
            .execute_batch(
                r#"
                CREATE TABLE legacy_users (id INTEGER PRIMARY KEY, mail TEXT, full_name TEXT);
                INSERT INTO legacy_users VALUES (1, 'a@example.com', 'Ada');
                INSERT INTO legacy_users VALUES (2, 'b@example.com', 'Bob');
                "#,
            )
            .unwrap();

        let target = Connection::open_in_memory().unwrap();
        target
            .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL, name TEXT);")
            .unwrap();

        (Rc::new(legacy), Rc::new(target))
    }

    fn copy(legacy: &Rc<Connection>, target: &Rc<Connection>) -> CopyMigration {
        let source = SqliteSource::new(legacy.clone(), "legacy_users", "id").unwrap();
        CopyMigration::new("migrate_users", source, target.clone(), "users")
            .unwrap()
            .with_column("id", "id")
            .unwrap()
            .with_column("email", "mail")
            .unwrap()
            .with_column("name", "full_name")
            .unwrap()
    }

    #[test]
    fn test_copy_is_idempotent() {
        let (legacy, target) = databases();
        let mut migration = copy(&legacy, &target);
        migration.before().unwrap();

        let rows = migration.source().fetch_after(0, 10).unwrap();
        assert_eq!(migration.migrate(&rows[0]), Ok(RowOutcome::Written));
        assert_eq!(migration.migrate(&rows[0]), Ok(RowOutcome::Unchanged));

        let email: String = target
            .query_row("SELECT email FROM users WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(email, "a@example.com");
    }

    #[test]
    fn test_not_null_violation_is_row_error() {
        let (legacy, target) = databases();
        let mut migration = copy(&legacy, &target);

        let row = Row::new().with("id", 9).with("mail", None::<String>).with("full_name", "Nobody");
        let err = migration.migrate(&row).unwrap_err();
        assert!(err.message().contains("NOT NULL"), "{}", err);

        let count: i64 = target
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_unique_conflict_is_unchanged() {
        let (legacy, target) = databases();
        target
            .execute("INSERT INTO users VALUES (1, 'taken@example.com', 'Ada')", [])
            .unwrap();
        let mut migration = copy(&legacy, &target);

        let rows = migration.source().fetch_after(0, 1).unwrap();
        assert_eq!(migration.migrate(&rows[0]), Ok(RowOutcome::Unchanged));
    }

    #[test]
    fn test_unknown_destination_column_is_row_error() {
        let (legacy, target) = databases();
        let source = SqliteSource::new(legacy, "legacy_users", "id").unwrap();
        let mut migration = CopyMigration::new("copy", source, target, "users")
            .unwrap()
            .with_column("nickname", "full_name")
            .unwrap();

        let row = Row::new().with("id", 1).with("full_name", "Ada");
        let err = migration.migrate(&row).unwrap_err();
        assert!(err.message().contains("nickname"), "{}", err);
    }

    #[test]
    fn test_missing_source_column_is_row_error() {
        let (legacy, target) = databases();
        let mut migration = copy(&legacy, &target);

        let err = migration.migrate(&Row::new().with("id", 3)).unwrap_err();
        assert_eq!(err.message(), "source row has no column mail");
    }

    #[test]
    fn test_copy_all_columns() {
        let (legacy, target) = databases();
        target
            .execute_batch("CREATE TABLE legacy_copy (id INTEGER PRIMARY KEY, mail TEXT, full_name TEXT);")
            .unwrap();
        let source = SqliteSource::new(legacy, "legacy_users", "id").unwrap();
        let mut migration = CopyMigration::new("copy", source, target.clone(), "legacy_copy").unwrap();

        let rows = migration.source().fetch_after(0, 10).unwrap();
        for row in rows {
            assert_eq!(migration.migrate(&row), Ok(RowOutcome::Written));
        }

        let count: i64 = target
            .query_row("SELECT COUNT(*) FROM legacy_copy", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_before_requires_destination_table() {
        let (legacy, target) = databases();
        let source = SqliteSource::new(legacy, "legacy_users", "id").unwrap();
        let mut migration = CopyMigration::new("copy", source, target, "missing").unwrap();

        assert!(matches!(migration.before(), Err(backfill_core::Error::Config(_))));
    }
}
