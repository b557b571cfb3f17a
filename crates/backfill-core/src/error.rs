//! Core error types.

use thiserror::Error;

/// Engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error from the sled-backed cursor store.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Cursor store error from any other backend.
    #[error("cursor store error: {0}")]
    Store(String),

    /// Persisted cursor value could not be decoded.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Source query failed while counting or streaming rows.
    #[error("source query error: {0}")]
    Query(String),

    /// A source row did not carry an integer value for the key field.
    #[error("row from {unit} has no integer key field `{field}`")]
    MissingKey {
        /// The unit streaming the row.
        unit: String,
        /// The configured key field.
        field: String,
    },

    /// Source returned rows out of ascending key order.
    #[error("source for {unit} returned key {key} after {previous}")]
    KeyOrder {
        /// The unit streaming the row.
        unit: String,
        /// The offending key.
        key: i64,
        /// The previously dequeued key.
        previous: i64,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reference to a migration unit that does not exist.
    #[error("unknown migration unit: {0}")]
    UnknownUnit(String),

    /// The dependency graph between migration units contains a cycle.
    #[error("dependency cycle among migration units: {}", .involved.join(", "))]
    CyclicDependency {
        /// Units that could not be ordered.
        involved: Vec<String>,
    },
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single row's migrate step.
///
/// Row failures never abort a run: they are counted, forwarded to the
/// failure log and the cursor moves past the row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RowError {
    message: String,
}

impl RowError {
    /// Create a row error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for RowError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for RowError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_lists_units() {
        let err = Error::CyclicDependency {
            involved: vec!["orders".to_string(), "users".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle among migration units: orders, users"
        );
    }

    #[test]
    fn test_row_error_message() {
        let err = RowError::from("duplicate email");
        assert_eq!(err.message(), "duplicate email");
        assert_eq!(err.to_string(), "duplicate email");
    }
}
