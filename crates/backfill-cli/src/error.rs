//! CLI error types.

use thiserror::Error;

/// Errors surfaced by the `backfill` command.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine error.
    #[error(transparent)]
    Engine(#[from] backfill_core::Error),

    /// SQLite collaborator error.
    #[error(transparent)]
    Backend(#[from] backfill_sqlite::Error),

    /// Error opening a SQLite database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error opening the cursor database.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Invalid plan file.
    #[error("invalid plan: {0}")]
    Plan(String),

    /// JSON encoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// No unit was selected on the command line.
    #[error("nothing to migrate: name units, pass `all` or use --force (available: {0})")]
    NoSelection(String),
}

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;
