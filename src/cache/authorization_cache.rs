use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use crate::CacheWatcher;
use crate::MembershipChange;
use crate::Result;
use crate::UserInfo;
use crate::WatchableCache;
use crate::WatcherId;

/// Users and groups allowed to see one namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceAccess {
    pub users: HashSet<String>,
    pub groups: HashSet<String>,
}

impl NamespaceAccess {
    pub fn new<U, G>(
        users: U,
        groups: G,
    ) -> Self
    where
        U: IntoIterator,
        U::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        Self {
            users: users.into_iter().map(Into::into).collect(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }
}

impl MembershipChange {
    /// Change taking `namespace` from `previous` to `latest` access.
    pub fn between(
        namespace: &str,
        previous: &NamespaceAccess,
        latest: &NamespaceAccess,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            latest_users: latest.users.clone(),
            latest_groups: latest.groups.clone(),
            removed_users: previous.users.difference(&latest.users).cloned().collect(),
            removed_groups: previous.groups.difference(&latest.groups).cloned().collect(),
            added_users: latest.users.difference(&previous.users).cloned().collect(),
            added_groups: latest.groups.difference(&previous.groups).cloned().collect(),
        }
    }
}

/// In-memory membership cache and change dispatcher.
///
/// Every mutation is dispatched synchronously on the caller's thread to a
/// snapshot of the registered watchers. A dispatch lock keeps notifications
/// serial, so each watcher sees changes one at a time and in order.
/// Watchers may deregister themselves from inside a notification.
pub struct AuthorizationCache {
    access: DashMap<String, NamespaceAccess>,
    watchers: DashMap<WatcherId, Arc<dyn CacheWatcher>>,
    dispatch_lock: Mutex<()>,
}

impl std::fmt::Debug for AuthorizationCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AuthorizationCache")
            .field("access", &self.access)
            .field("watchers", &self.watchers.len())
            .finish_non_exhaustive()
    }
}

impl Default for AuthorizationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationCache {
    pub fn new() -> Self {
        Self {
            access: DashMap::new(),
            watchers: DashMap::new(),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Replace who may see `namespace` and notify every watcher.
    pub fn set_access(
        &self,
        namespace: &str,
        latest: NamespaceAccess,
    ) {
        let _guard = self.dispatch_lock.lock();

        let previous = self
            .access
            .insert(namespace.to_string(), latest.clone())
            .unwrap_or_default();
        self.dispatch(&MembershipChange::between(namespace, &previous, &latest));
    }

    /// Forget `namespace`; everyone who could see it loses access.
    pub fn remove_namespace(
        &self,
        namespace: &str,
    ) {
        let _guard = self.dispatch_lock.lock();

        if let Some((_, previous)) = self.access.remove(namespace) {
            self.dispatch(&MembershipChange::between(
                namespace,
                &previous,
                &NamespaceAccess::default(),
            ));
        }
    }

    /// The namespace object changed but its access did not. Watchers that
    /// can see it report it as Modified.
    pub fn namespace_updated(
        &self,
        namespace: &str,
    ) {
        let _guard = self.dispatch_lock.lock();

        if let Some(current) = self.access.get(namespace).map(|a| a.value().clone()) {
            self.dispatch(&MembershipChange::between(namespace, &current, &current));
        }
    }

    pub fn access(
        &self,
        namespace: &str,
    ) -> Option<NamespaceAccess> {
        self.access.get(namespace).map(|a| a.value().clone())
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    fn dispatch(
        &self,
        change: &MembershipChange,
    ) {
        // Snapshot first: handlers may call remove_watcher on this map.
        let watchers: Vec<Arc<dyn CacheWatcher>> =
            self.watchers.iter().map(|w| w.value().clone()).collect();

        for watcher in &watchers {
            watcher.group_membership_changed(change);
        }

        trace!(
            namespace = %change.namespace,
            watchers = watchers.len(),
            "membership change dispatched"
        );
    }
}

impl WatchableCache for AuthorizationCache {
    fn list(
        &self,
        user: &UserInfo,
    ) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .access
            .iter()
            .filter(|entry| user.is_in(&entry.value().users, &entry.value().groups))
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn add_watcher(
        &self,
        watcher: Arc<dyn CacheWatcher>,
    ) {
        debug!(watcher_id = watcher.id(), "watcher registered");
        self.watchers.insert(watcher.id(), watcher);
    }

    fn remove_watcher(
        &self,
        id: WatcherId,
    ) {
        if self.watchers.remove(&id).is_some() {
            debug!(watcher_id = id, "watcher removed");
        }
    }
}
