use std::time::Duration;

use serde::Deserialize;

/// Minimum gap between two auto-flushes.
pub const MIN_TIME_BETWEEN_FLUSHES_MS: u64 = 5;
/// Number of recent call ids remembered for diagnostics.
pub const DEBUG_INFO_LIMIT: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Enables argument validation, call labelling, and the diagnostic
    /// lookup tables. Missing callbacks become hard errors when set.
    pub diagnostics: bool,
    pub min_flush_interval_ms: u64,
    pub debug_info_limit: usize,
}

impl QueueConfig {
    pub fn development() -> Self {
        Self {
            diagnostics: true,
            ..Self::production()
        }
    }

    pub fn production() -> Self {
        Self {
            diagnostics: false,
            min_flush_interval_ms: MIN_TIME_BETWEEN_FLUSHES_MS,
            debug_info_limit: DEBUG_INFO_LIMIT,
        }
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn min_flush_interval(&self) -> Duration {
        Duration::from_millis(self.min_flush_interval_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::production().with_diagnostics(cfg!(debug_assertions))
    }
}
