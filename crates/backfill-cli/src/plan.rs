//! Plan files: which tables to copy where.
//!
//! ```json
//! {
//!   "source": "legacy.db",
//!   "destination": "app.db",
//!   "units": [
//!     {
//!       "name": "migrate_users",
//!       "source_table": "legacy_users",
//!       "destination_table": "users",
//!       "columns": { "id": "id", "email": "mail" }
//!     }
//!   ]
//! }
//! ```
//!
//! Relative database paths are resolved against the plan file's directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use backfill_core::{CursorStore, EngineConfig, MigrationUnit, TracingFailureLog};
use backfill_sqlite::{quote_identifier, CopyMigration, SqliteSource};
use rusqlite::Connection;
use serde::Deserialize;

use crate::error::{Error, Result};

fn default_key() -> String {
    "id".to_string()
}

/// A plan file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    /// Legacy SQLite database.
    pub source: PathBuf,

    /// Destination SQLite database.
    pub destination: PathBuf,

    /// Units in declared order.
    pub units: Vec<UnitPlan>,
}

/// One column-copy unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitPlan {
    /// Unit name; also names the unit's cursor.
    pub name: String,

    /// Legacy table to read.
    pub source_table: String,

    /// Integer key column of the legacy table.
    #[serde(default = "default_key")]
    pub key: String,

    /// Destination table to write.
    pub destination_table: String,

    /// Destination column to source column. Empty copies all columns.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,

    /// Units that must run first.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Rescan the whole source on every run.
    #[serde(default)]
    pub disabled_cursor: bool,
}

impl PlanFile {
    /// Read, resolve and validate a plan file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Plan(format!("cannot read {}: {}", path.display(), e)))?;
        let mut plan = Self::from_json(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        plan.source = resolve(base, &plan.source);
        plan.destination = resolve(base, &plan.destination);
        Ok(plan)
    }

    /// Parse and validate a plan from JSON.
    pub fn from_json(content: &str) -> Result<Self> {
        let plan: PlanFile =
            serde_json::from_str(content).map_err(|e| Error::Plan(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Check names and identifiers. Graph problems are left to the
    /// orchestrator.
    pub fn validate(&self) -> Result<()> {
        if self.units.is_empty() {
            return Err(Error::Plan("no units declared".to_string()));
        }

        for unit in &self.units {
            if unit.name.trim().is_empty() {
                return Err(Error::Plan("unit with an empty name".to_string()));
            }

            let identifiers = [&unit.source_table, &unit.key, &unit.destination_table]
                .into_iter()
                .chain(unit.columns.iter().flat_map(|(dest, src)| [dest, src]));
            for identifier in identifiers {
                quote_identifier(identifier)
                    .map_err(|e| Error::Plan(format!("unit {}: {}", unit.name, e)))?;
            }
        }

        Ok(())
    }

    /// Unit names in declared order.
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name.as_str()).collect()
    }

    /// Build migration units over open connections.
    pub fn build_units(
        &self,
        source: &Rc<Connection>,
        target: &Rc<Connection>,
        store: Arc<dyn CursorStore>,
        engine: &EngineConfig,
    ) -> Result<Vec<MigrationUnit>> {
        let failure_log = Arc::new(TracingFailureLog);

        self.units
            .iter()
            .map(|plan| -> Result<MigrationUnit> {
                let rows = SqliteSource::new(source.clone(), &plan.source_table, &plan.key)?;
                let mut migration =
                    CopyMigration::new(plan.name.clone(), rows, target.clone(), &plan.destination_table)?;
                for (dest, src) in &plan.columns {
                    migration = migration.with_column(dest, src)?;
                }
                for dependency in &plan.depends_on {
                    migration = migration.with_dependency(dependency.clone());
                }

                let mut unit = MigrationUnit::new(migration, store.clone())
                    .with_config(engine.clone())
                    .with_failure_log(failure_log.clone());
                if plan.disabled_cursor {
                    unit = unit.with_disabled_cursor();
                }
                Ok(unit)
            })
            .collect()
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
