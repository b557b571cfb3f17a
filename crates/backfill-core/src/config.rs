//! Engine configuration.

use std::time::Duration;

/// Default number of rows fetched per keyset chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default minimum interval between progress hint refreshes.
pub const DEFAULT_HINT_INTERVAL: Duration = Duration::from_secs(1);

/// Default namespace for persisted cursor keys.
pub const DEFAULT_KEY_PREFIX: &str = "migration";

/// Configuration shared by every migration unit of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Rows fetched per keyset chunk. Bounds memory use while streaming.
    pub chunk_size: usize,

    /// Minimum wall-clock interval between progress hint refreshes.
    pub hint_interval: Duration,

    /// Namespace prepended to unit names to form cursor store keys.
    pub key_prefix: String,
}

impl EngineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            hint_interval: DEFAULT_HINT_INTERVAL,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Set the chunk size (at least one row).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the progress hint interval.
    pub fn with_hint_interval(mut self, interval: Duration) -> Self {
        self.hint_interval = interval;
        self
    }

    /// Set the cursor key namespace.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Cursor store key for a unit name.
    pub fn cursor_key(&self, name: &str) -> String {
        if self.key_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.key_prefix, name)
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
