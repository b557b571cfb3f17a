//! SQLite backend errors.

use thiserror::Error;

/// Errors raised by the SQLite collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Table or column name that cannot be used as an identifier.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Result type alias for SQLite operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for backfill_core::Error {
    fn from(e: Error) -> Self {
        backfill_core::Error::Query(e.to_string())
    }
}

/// Validate an identifier and return it double-quoted for SQL.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub fn quote_identifier(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(format!("\"{}\"", name))
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users").unwrap(), "\"users\"");
        assert_eq!(quote_identifier("_legacy_users2").unwrap(), "\"_legacy_users2\"");
    }

    #[test]
    fn test_rejects_invalid_identifiers() {
        for name in ["", "2users", "users; DROP TABLE x", "a\"b", "naïve"] {
            assert!(
                matches!(quote_identifier(name), Err(Error::InvalidIdentifier(_))),
                "{name:?} accepted"
            );
        }
    }

    #[test]
    fn test_converts_to_query_error() {
        let err: backfill_core::Error = Error::InvalidIdentifier("1x".to_string()).into();
        assert!(matches!(err, backfill_core::Error::Query(_)));
    }
}
