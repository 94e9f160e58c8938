//! Per-user project watch
//!
//! A membership cache calls every registered watcher, one after another on
//! its own thread, whenever the set of users and groups allowed to see a
//! namespace changes. [`ProjectWatcher`] turns those calls into an ordered
//! stream of project events for a single user.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────┐
//! │ Membership cache │  calls every watcher serially
//! └────────┬─────────┘
//!          │ group_membership_changed() [never blocks]
//!          ▼
//! ┌──────────────────┐      full ──► deregister + error slot
//! │  Intake buffer   │ (tokio mpsc, bounded, try_send)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Relay task     │ initial snapshot, then buffer / stop / error
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   WatchStream    │ consumer side, paired with stop()
//! └──────────────────┘
//! ```
//!
//! # Delivery guarantees
//!
//! - Events for one watcher arrive in the order they were enqueued; the
//!   initial snapshot (if requested) comes first.
//! - A full intake buffer is terminal: the watcher deregisters itself and the
//!   consumer receives exactly one `Error` event, after which the stream ends.
//! - A namespace that cannot be resolved is skipped with a warning; the
//!   watcher stays alive.
//!
//! # Relay priority
//!
//! The relay task polls, in fixed order: stop, buffered events, terminal
//! error. Stop wins over a pending error, so a stopped stream closes without
//! an `Error` event. Buffered events drain before the error, so the error is
//! always last.

mod high_water_mark;
mod types;
mod watcher;

#[cfg(test)]
mod high_water_mark_test;

pub use high_water_mark::*;
pub use types::*;
pub use watcher::*;

#[cfg(test)]
use mockall::automock;

use crate::LookupError;
use crate::Result;

/// Unique identifier of a registered watcher
pub type WatcherId = u64;

/// Receiver of membership change notifications.
pub trait CacheWatcher: Send + Sync + 'static {
    fn id(&self) -> WatcherId;

    /// Called serially for all changes for all watchers. This method MUST NOT
    /// BLOCK: a stall here stalls delivery to every other watcher.
    fn group_membership_changed(
        &self,
        change: &MembershipChange,
    );
}

/// Membership cache as seen by a watcher
#[cfg_attr(test, automock)]
pub trait WatchableCache: Send + Sync + 'static {
    /// Names of the namespaces `user` may currently see
    fn list(
        &self,
        user: &UserInfo,
    ) -> Result<Vec<String>>;

    /// The cache owns `watcher` until it is removed; watchers only hold a
    /// weak reference back, so dropping the cache closes their streams.
    fn add_watcher(
        &self,
        watcher: std::sync::Arc<dyn CacheWatcher>,
    );

    /// Idempotent; may race with itself from the dispatcher and a relay task.
    fn remove_watcher(
        &self,
        id: WatcherId,
    );
}

/// Resolves a namespace name to its full representation.
///
/// Called from the dispatcher thread, so implementations must answer from
/// memory.
#[cfg_attr(test, automock)]
pub trait ProjectLookup: Send + Sync + 'static {
    fn get_namespace(
        &self,
        name: &str,
    ) -> std::result::Result<Namespace, LookupError>;
}
