//! Migration units and their run loop.
//!
//! A [`Migration`] describes what to copy: where rows come from, which
//! field is their identity key, where they go and how one row is written.
//! A [`MigrationUnit`] wraps a migration with its persisted [`Cursor`] and
//! drives the resumable scan:
//!
//! 1. count rows at or below the cursor (`skip`) and above it (`left`)
//! 2. run the `before` hook
//! 3. fetch rows after the last seen key in ascending chunks
//! 4. migrate each row, count the outcome and move the cursor to its key
//! 5. run the `after` hook
//!
//! A failing row is counted and logged but never stops the scan, and the
//! cursor moves past it all the same. Source, cursor store and hook errors
//! end the run; everything processed before them stays committed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::cursor::Cursor;
use crate::error::{Error, Result, RowError};
use crate::failure::{FailureLog, RowFailure};
use crate::progress::{Estimator, ProgressSink};
use crate::row::Row;
use crate::source::{KeyRange, SourceQuery};
use crate::stats::RunStats;
use crate::store::CursorStore;

/// Result of migrating a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// The row produced a write in the destination.
    Written,
    /// Nothing needed to be written.
    Unchanged,
}

impl From<bool> for RowOutcome {
    fn from(written: bool) -> Self {
        if written {
            RowOutcome::Written
        } else {
            RowOutcome::Unchanged
        }
    }
}

/// A concrete data migration.
pub trait Migration {
    /// Stable identity, also used to name the cursor.
    fn name(&self) -> &str;

    /// Human readable title, `MigrateUsers` becomes `Migrate Users`.
    fn title(&self) -> String {
        headline(self.name())
    }

    /// Destination the unit writes to.
    fn destination(&self) -> &str;

    /// Integer identity key field of source rows.
    fn key_name(&self) -> &str;

    /// Source rows to migrate.
    fn source(&self) -> &dyn SourceQuery;

    /// Names of units that must run first.
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Migrate one row.
    fn migrate(&mut self, row: &Row) -> std::result::Result<RowOutcome, RowError>;

    /// Called once before rows are streamed.
    fn before(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after the last row of a run.
    fn after(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Turn an identifier into a title: `crate::MigrateUsers`, `migrate_users`
/// and `migrate-users` all become `Migrate Users`.
pub fn headline(name: &str) -> String {
    let base = name.rsplit("::").next().unwrap_or(name);

    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in base.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A migration bound to its cursor and run counters.
pub struct MigrationUnit {
    migration: Box<dyn Migration>,
    cursor: Cursor,
    config: EngineConfig,
    failure_log: Option<Arc<dyn FailureLog>>,
    depends_on: Vec<String>,
    succeed: u64,
    skipped: u64,
    failed: u64,
    duration: Duration,
}

impl MigrationUnit {
    /// Create a unit with the default engine configuration.
    pub fn new<M: Migration + 'static>(migration: M, store: Arc<dyn CursorStore>) -> Self {
        let config = EngineConfig::default();
        let name = migration.name().to_string();
        let cursor = Cursor::new(name.clone(), config.cursor_key(&name), store);
        let depends_on = migration.depends_on();

        Self {
            migration: Box::new(migration),
            cursor,
            config,
            failure_log: None,
            depends_on,
            succeed: 0,
            skipped: 0,
            failed: 0,
            duration: Duration::ZERO,
        }
    }

    /// Use `config` for chunking, hint throttling and cursor naming.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.cursor.rekey(config.cursor_key(self.migration.name()));
        self.config = config;
        self
    }

    /// Forward row failures to `log`.
    pub fn with_failure_log(mut self, log: Arc<dyn FailureLog>) -> Self {
        self.failure_log = Some(log);
        self
    }

    /// Disable the cursor: every run rescans from the start.
    pub fn with_disabled_cursor(mut self) -> Self {
        self.cursor.disable();
        self
    }

    /// Set or clear the failure log.
    pub fn set_failure_log(&mut self, log: Option<Arc<dyn FailureLog>>) {
        self.failure_log = log;
    }

    /// The unit's cursor.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// The unit's cursor (mutable).
    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    /// Unit name.
    pub fn name(&self) -> &str {
        self.migration.name()
    }

    /// Unit title.
    pub fn title(&self) -> String {
        self.migration.title()
    }

    /// Destination identifier.
    pub fn destination(&self) -> &str {
        self.migration.destination()
    }

    /// Names of units this one depends on.
    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    /// Rows at or below the cursor.
    pub fn skip_count(&self) -> Result<u64> {
        self.migration
            .source()
            .count(KeyRange::AtMost(self.cursor.get()))
    }

    /// Rows above the cursor.
    pub fn left_count(&self) -> Result<u64> {
        self.migration
            .source()
            .count(KeyRange::After(self.cursor.get()))
    }

    /// All source rows: `skip_count() + left_count()`.
    pub fn total(&self) -> Result<u64> {
        let position = self.cursor.get();
        let source = self.migration.source();
        Ok(source.count(KeyRange::AtMost(position))? + source.count(KeyRange::After(position))?)
    }

    /// Rows written by the last run.
    pub fn succeed(&self) -> u64 {
        self.succeed
    }

    /// Rows left unchanged by the last run.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Rows that failed in the last run.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Wall-clock duration of the last run.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Counters of the last run.
    pub fn stats(&self) -> RunStats {
        RunStats {
            succeed: self.succeed,
            skipped: self.skipped,
            failed: self.failed,
            duration: self.duration,
        }
    }

    /// Migrate rows above the cursor, at most `limit` of them.
    ///
    /// The sink, when given, is always finished, including on error.
    pub fn run(&mut self, limit: Option<u64>, mut progress: Option<&mut dyn ProgressSink>) -> Result<RunStats> {
        self.succeed = 0;
        self.skipped = 0;
        self.failed = 0;

        let started = Instant::now();
        info!(unit = %self.name(), "starting migration unit");

        let scanned = self.scan(started, limit, &mut progress);

        self.duration = started.elapsed();
        if let Some(sink) = progress.as_mut() {
            sink.finish();
        }

        let flushed = self.cursor.flush();
        scanned?;
        flushed?;

        info!(
            unit = %self.name(),
            succeed = self.succeed,
            skipped = self.skipped,
            failed = self.failed,
            duration_ms = self.duration.as_millis() as u64,
            "migration unit finished"
        );
        Ok(self.stats())
    }

    fn scan(
        &mut self,
        started: Instant,
        limit: Option<u64>,
        progress: &mut Option<&mut dyn ProgressSink>,
    ) -> Result<()> {
        let position = self.cursor.get();
        let skip = self.migration.source().count(KeyRange::AtMost(position))?;
        let left = self.migration.source().count(KeyRange::After(position))?;
        let total = skip + left;

        if let Some(sink) = progress.as_mut() {
            sink.start(total);
            sink.advance(skip);
        }

        self.migration.before()?;

        let key_name = self.migration.key_name().to_string();
        let chunk_size = self.config.chunk_size.max(1) as u64;
        let mut estimator = Estimator::starting_at(started, self.config.hint_interval);
        let mut last_key = position;
        let mut processed: u64 = 0;

        loop {
            let wanted = match limit {
                Some(limit) => limit.saturating_sub(processed).min(chunk_size),
                None => chunk_size,
            } as usize;
            if wanted == 0 {
                break;
            }

            let rows = self.migration.source().fetch_after(last_key, wanted)?;
            let fetched = rows.len();
            debug!(unit = %self.name(), after = last_key, rows = fetched, "fetched chunk");

            for row in rows.into_iter().take(wanted) {
                let key = row.key(&key_name).ok_or_else(|| Error::MissingKey {
                    unit: self.migration.name().to_string(),
                    field: key_name.clone(),
                })?;
                if key <= last_key {
                    return Err(Error::KeyOrder {
                        unit: self.migration.name().to_string(),
                        key,
                        previous: last_key,
                    });
                }

                match self.migration.migrate(&row) {
                    Ok(RowOutcome::Written) => self.succeed += 1,
                    Ok(RowOutcome::Unchanged) => self.skipped += 1,
                    Err(e) => {
                        self.failed += 1;
                        if let Some(log) = &self.failure_log {
                            log.record(&RowFailure {
                                unit: self.migration.name().to_string(),
                                key,
                                message: e.message().to_string(),
                            });
                        }
                    }
                }

                self.cursor.set(key)?;
                last_key = key;
                processed += 1;

                if let Some(sink) = progress.as_mut() {
                    sink.advance(1);
                    if let Some(hint) = estimator.tick(Instant::now(), skip + processed, processed, total) {
                        sink.hint(&hint.text);
                    }
                }
            }

            if fetched < wanted {
                break;
            }
        }

        self.migration.after()
    }
}

impl std::fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("name", &self.name())
            .field("cursor", &self.cursor)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}
