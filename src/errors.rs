//! Project Watch Error Hierarchy
//!
//! Failures are scoped to a single watcher's lifecycle; nothing here is fatal
//! to the surrounding process.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings could not be loaded or failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Watcher lifecycle failures
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Resource resolution failures
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// Intake buffer was full when an Added/Modified event arrived
    #[error("add notification timeout")]
    AddNotificationTimeout,

    /// Intake buffer was full when a Deleted event arrived
    #[error("delete notification timeout")]
    DeleteNotificationTimeout,

    /// The membership cache could not list the subscriber's namespaces
    #[error("failed to list namespaces for user {user}: {reason}")]
    ListFailed { user: String, reason: String },

    /// The relay task has nowhere to run
    #[error("no async runtime available: {0}")]
    RuntimeUnavailable(String),
}

impl WatchError {
    /// Label used for the overflow counter.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            WatchError::AddNotificationTimeout => "add",
            WatchError::DeleteNotificationTimeout => "delete",
            WatchError::ListFailed { .. } => "list",
            WatchError::RuntimeUnavailable(_) => "runtime",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("namespace \"{0}\" not found")]
    NotFound(String),

    /// Backing store could not answer
    #[error("namespace lookup unavailable: {0}")]
    Unavailable(String),
}
