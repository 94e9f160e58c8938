//! In-memory collaborators for the project watch.
//!
//! [`AuthorizationCache`] tracks who may see which namespace and fans every
//! change out to registered watchers; [`NamespaceStore`] resolves namespace
//! names. Both answer from memory so they are safe to call from the
//! dispatcher thread.

mod authorization_cache;
mod namespace_store;


pub use authorization_cache::*;
pub use namespace_store::*;
