//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of undo steps kept by the document undo manager.
pub const DEFAULT_MAX_UNDO_STEPS: usize = 100;
/// Default capacity of the document change feed.
pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 256;
/// Default minimum spacing between local cursor broadcasts, in milliseconds.
pub const DEFAULT_CURSOR_THROTTLE_MS: u64 = 50;
/// Remote cursors older than this are dropped, in milliseconds.
pub const DEFAULT_CURSOR_EXPIRY_MS: u64 = 5_000;
/// Interval of the remote cursor pruning tick, in milliseconds.
pub const DEFAULT_CURSOR_TICK_MS: u64 = 1_000;

/// Tunables for documents, slide instances and the cursor broadcaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_undo_steps: usize,
    pub change_feed_capacity: usize,
    pub cursor_throttle_ms: u64,
    pub cursor_expiry_ms: u64,
    pub cursor_tick_ms: u64,
}

impl EngineConfig {
    pub fn cursor_throttle(&self) -> Duration {
        Duration::from_millis(self.cursor_throttle_ms)
    }

    pub fn cursor_expiry(&self) -> Duration {
        Duration::from_millis(self.cursor_expiry_ms)
    }

    /// Pruning tick. Never zero: a timer needs a non-zero period.
    pub fn cursor_tick(&self) -> Duration {
        Duration::from_millis(self.cursor_tick_ms.max(1))
    }

    /// Parse a JSON config; missing keys take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_MAX_UNDO_STEPS,
            change_feed_capacity: DEFAULT_CHANGE_FEED_CAPACITY,
            cursor_throttle_ms: DEFAULT_CURSOR_THROTTLE_MS,
            cursor_expiry_ms: DEFAULT_CURSOR_EXPIRY_MS,
            cursor_tick_ms: DEFAULT_CURSOR_TICK_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{ "cursor_throttle_ms": 16 }"#).unwrap();
        assert_eq!(config.cursor_throttle(), Duration::from_millis(16));
        assert_eq!(config.cursor_expiry(), Duration::from_secs(5));
        assert_eq!(config.cursor_tick(), Duration::from_secs(1));
        assert_eq!(config.max_undo_steps, DEFAULT_MAX_UNDO_STEPS);
    }

    #[test]
    fn test_zero_tick_is_clamped() {
        let config = EngineConfig::from_json(r#"{ "cursor_tick_ms": 0 }"#).unwrap();
        assert_eq!(config.cursor_tick(), Duration::from_millis(1));
    }
}
