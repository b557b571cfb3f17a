//! Resumable keyset migration engine.
//!
//! This crate moves rows from a legacy source into a new destination in
//! small, restartable steps:
//!
//! - **Cursors**: the last migrated key of every unit, persisted in a
//!   [`CursorStore`] so an interrupted backfill resumes where it stopped
//! - **Migration units**: a [`Migration`] plus its [`Cursor`], streaming rows
//!   past the cursor in ascending key order and counting per-row outcomes
//! - **Progress**: a throttled throughput and ETA [`Estimator`]
//! - **Orchestration**: dependency-ordered reset, run and inspect modes over
//!   a validated set of units

pub mod config;
pub mod cursor;
pub mod error;
pub mod failure;
pub mod orchestrator;
pub mod progress;
pub mod row;
pub mod source;
pub mod stats;
pub mod store;
pub mod unit;

pub use config::EngineConfig;
pub use cursor::Cursor;
pub use error::{Error, Result, RowError};
pub use failure::{FailureLog, RowFailure, TracingFailureLog};
pub use orchestrator::{NullReporter, Orchestrator, Reporter, RunOptions, Selection};
pub use progress::{Estimator, NullSink, ProgressHint, ProgressSink};
pub use row::{Row, Value};
pub use source::{KeyRange, MemorySource, SourceQuery};
pub use stats::{Destination, RunStats, StatRow, UnitReport};
pub use store::{CursorStore, MemoryCursorStore, SledCursorStore};
pub use unit::{Migration, MigrationUnit, RowOutcome};
