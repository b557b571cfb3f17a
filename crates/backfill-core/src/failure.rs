//! Per-row failure logging.

use tracing::error;

/// A row whose migrate step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    /// Unit that dequeued the row.
    pub unit: String,
    /// Source key of the row.
    pub key: i64,
    /// Failure message.
    pub message: String,
}

/// Destination for row failures.
pub trait FailureLog: Send + Sync {
    /// Record one failed row.
    fn record(&self, failure: &RowFailure);
}

/// Failure log that emits `error` level tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFailureLog;

impl FailureLog for TracingFailureLog {
    fn record(&self, failure: &RowFailure) {
        error!(
            unit = %failure.unit,
            key = failure.key,
            error = %failure.message,
            "row migration failed"
        );
    }
}
