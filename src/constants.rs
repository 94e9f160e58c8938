// -
// Watch buffers

/// Capacity of each watcher's intake buffer unless configured otherwise.
pub const DEFAULT_WATCH_BUFFER_SIZE: usize = 1000;

/// Capacity of the consumer-facing channel. One slot is the closest
/// tokio gets to a rendezvous channel.
pub const DEFAULT_OUTPUT_BUFFER_SIZE: usize = 1;

/// Above this intake capacity the config validator only warns.
pub(crate) const LARGE_WATCH_BUFFER_SIZE: usize = 100_000;

// -
// Config sources

pub(crate) const CONFIG_ENV_PREFIX: &str = "PROJECT";
pub(crate) const CONFIG_ENV_SEPARATOR: &str = "__";
pub(crate) const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

// -
// Project metadata

/// Phase reported for namespaces that are serving normally.
pub const PHASE_ACTIVE: &str = "Active";
