//! Engine configuration.
//!
//! すべてのフィールドにデフォルトがあるので、JSON では変えたいものだけ書けばよい。
//!
//! ```json
//! { "tick_interval_ms": 5, "max_pending": 10000 }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default worker tick (upper bound on claim latency).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10;

/// Default ring size of the outcome broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

pub const DEFAULT_WORKER_THREAD_NAME: &str = "spindle-worker";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// How long the worker sleeps when the queue is empty.
    /// Enqueue also wakes it, so this only bounds the worst case.
    pub tick_interval_ms: u64,

    /// Buffered events per subscriber before the slowest one starts lagging.
    pub event_capacity: usize,

    /// Maximum number of queued (not yet claimed) live tasks.
    /// `None` keeps the queue unbounded.
    pub max_pending: Option<usize>,

    pub worker_thread_name: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_pending: None,
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_capacity must be greater than 0".to_string(),
            ));
        }
        if self.max_pending == Some(0) {
            return Err(ConfigError::Invalid(
                "max_pending must be greater than 0 (omit it for an unbounded queue)".to_string(),
            ));
        }
        if self.worker_thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "worker_thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
