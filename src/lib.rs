//! Per-subscriber project watch.
//!
//! A membership cache pushes every visibility change to all registered
//! watchers, synchronously and serially. [`ProjectWatcher`] turns those
//! pushes into an ordered, cancellable [`WatchStream`] for a single user.

mod cache;
mod config;
mod errors;
mod metrics;
mod watch;

pub mod constants;

pub use cache::*;
pub use self::config::*;
pub use errors::*;
pub use metrics::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
