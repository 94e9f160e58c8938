use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::LookupError;
use crate::MockProjectLookup;
use crate::MockWatchableCache;
use crate::Namespace;
use crate::Project;
use crate::WatcherId;

/// Cache listing `visible` for every user; each `remove_watcher` call is
/// reported on the returned channel.
pub(crate) fn mock_cache(
    visible: &[&str]
) -> (MockWatchableCache, mpsc::UnboundedReceiver<WatcherId>) {
    let names: Vec<String> = visible.iter().map(|s| s.to_string()).collect();
    let (removed_tx, removed_rx) = mpsc::unbounded_channel();

    let mut cache = MockWatchableCache::new();
    cache.expect_list().returning(move |_| Ok(names.clone()));
    cache.expect_remove_watcher().returning(move |id| {
        let _ = removed_tx.send(id);
    });
    cache.expect_add_watcher().returning(|_| ());

    (cache, removed_rx)
}

/// Lookup resolving every name except `unresolvable`
pub(crate) fn mock_lookup(unresolvable: &[&str]) -> MockProjectLookup {
    let failing: HashSet<String> = unresolvable.iter().map(|s| s.to_string()).collect();

    let mut lookup = MockProjectLookup::new();
    lookup.expect_get_namespace().returning(move |name| {
        if failing.contains(name) {
            Err(LookupError::NotFound(name.to_string()))
        } else {
            Ok(resolved_namespace(name))
        }
    });
    lookup
}

/// What `mock_lookup` resolves `name` to
pub(crate) fn resolved_namespace(name: &str) -> Namespace {
    Namespace::new(name).with_annotation("openshift.io/display-name", name.to_uppercase())
}

pub(crate) fn resolved_project(name: &str) -> Project {
    Project::from(&resolved_namespace(name))
}

/// Count the deregistrations recorded so far
pub(crate) fn removal_count(removed: &mut mpsc::UnboundedReceiver<WatcherId>) -> usize {
    let mut count = 0;
    while removed.try_recv().is_ok() {
        count += 1;
    }
    count
}
