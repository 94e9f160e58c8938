use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::constants::DEFAULT_OUTPUT_BUFFER_SIZE;
use crate::constants::DEFAULT_WATCH_BUFFER_SIZE;
use crate::constants::LARGE_WATCH_BUFFER_SIZE;
use crate::Error;
use crate::Result;

/// Per-watcher channel sizing and subscription defaults
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Capacity of the intake buffer between the dispatcher and the relay task
    ///
    /// When a change arrives while the buffer is full the watcher is torn
    /// down and its consumer receives a terminal error event, so this bounds
    /// how far a slow consumer may fall behind.
    ///
    /// **Default**: 1000
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Capacity of the consumer-facing channel
    ///
    /// **Default**: 1
    #[serde(default = "default_output_buffer_size")]
    pub output_buffer_size: usize,

    /// Replay every currently visible project as Added before live changes
    /// when the subscriber does not say otherwise
    #[serde(default)]
    pub include_existing: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            output_buffer_size: default_output_buffer_size(),
            include_existing: false,
        }
    }
}

impl WatchConfig {
    /// Validates watch configuration parameters
    pub fn validate(&self) -> Result<()> {
        validate_channel_size("watch.buffer_size", self.buffer_size)?;
        validate_channel_size("watch.output_buffer_size", self.output_buffer_size)?;

        if self.buffer_size > LARGE_WATCH_BUFFER_SIZE {
            warn!(
                "watch.buffer_size ({}) is very large; every watcher reserves this many slots",
                self.buffer_size
            );
        }

        Ok(())
    }
}

/// Bounded channels need at least one slot and cannot exceed the
/// semaphore permit limit.
fn validate_channel_size(
    key: &str,
    size: usize,
) -> Result<()> {
    if size == 0 {
        return Err(Error::Config(ConfigError::Message(format!(
            "{key} must be greater than 0"
        ))));
    }

    if size > Semaphore::MAX_PERMITS {
        return Err(Error::Config(ConfigError::Message(format!(
            "{key} ({size}) exceeds the channel limit of {}",
            Semaphore::MAX_PERMITS
        ))));
    }

    Ok(())
}

const fn default_buffer_size() -> usize {
    DEFAULT_WATCH_BUFFER_SIZE
}

const fn default_output_buffer_size() -> usize {
    DEFAULT_OUTPUT_BUFFER_SIZE
}
