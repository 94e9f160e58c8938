use std::collections::HashSet;
use std::pin::Pin;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;
use std::task::Context;
use std::task::Poll;

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::CacheWatcher;
use super::HighWaterMark;
use super::MembershipChange;
use super::Project;
use super::ProjectLookup;
use super::UserInfo;
use super::WatchEvent;
use super::WatchableCache;
use super::WatcherId;
use crate::Result;
use crate::WatchConfig;
use crate::WatchError;
use crate::WATCH_ACTIVE_WATCHERS;
use crate::WATCH_CHANNEL_HIGH_WATER_MARK;
use crate::WATCH_LOOKUP_FAILURES_TOTAL;
use crate::WATCH_OVERFLOW_TOTAL;

/// How backed up the most backed up intake buffer got, across all watchers.
pub static WATCH_CHANNEL_HWM: HighWaterMark = HighWaterMark::new();

static NEXT_WATCHER_ID: AtomicU64 = AtomicU64::new(1);

/// Watches the projects visible to one user.
///
/// The membership cache drives the intake side through [`CacheWatcher`];
/// a relay task spawned at construction feeds the paired [`WatchStream`].
pub struct ProjectWatcher {
    id: WatcherId,
    user: UserInfo,

    /// Intake buffer. If it fills up the watcher is removed and the stream
    /// is broken.
    incoming: mpsc::Sender<WatchEvent>,
    /// Capacity-one slot for the terminal error; the first one wins.
    error_slot: mpsc::Sender<WatchError>,

    /// Only touched from the dispatcher thread.
    known_projects: Mutex<HashSet<String>>,

    stop_gate: Arc<StopGate>,

    lookup: Arc<dyn ProjectLookup>,
    /// The cache owns registered watchers, so only a weak reference back.
    cache: Weak<dyn WatchableCache>,
}

impl std::fmt::Debug for ProjectWatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ProjectWatcher")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("known_projects", &self.known_projects)
            .finish_non_exhaustive()
    }
}

impl ProjectWatcher {
    /// Build a watcher and spawn its relay task without registering it with
    /// the cache.
    ///
    /// Lists the namespaces `user` can see to seed the known set. When
    /// `include_existing` (or, if `None`, `config.include_existing`) is set,
    /// those namespaces are replayed as Added events before any live change;
    /// entries that fail to resolve are left out of the replay.
    ///
    /// Fails with [`WatchError::RuntimeUnavailable`] outside a Tokio runtime.
    pub fn new(
        user: UserInfo,
        include_existing: Option<bool>,
        lookup: Arc<dyn ProjectLookup>,
        cache: Arc<dyn WatchableCache>,
        config: &WatchConfig,
    ) -> Result<(Arc<Self>, WatchStream)> {
        config.validate()?;
        let runtime =
            Handle::try_current().map_err(|e| WatchError::RuntimeUnavailable(e.to_string()))?;

        let names = cache.list(&user)?;
        let known_projects: HashSet<String> = names.iter().cloned().collect();

        let initial_projects = if include_existing.unwrap_or(config.include_existing) {
            resolve_initial_projects(&user, &names, lookup.as_ref())
        } else {
            Vec::new()
        };

        let id = NEXT_WATCHER_ID.fetch_add(1, Ordering::Relaxed);
        let (incoming_tx, incoming_rx) = mpsc::channel(config.buffer_size);
        let (error_tx, error_rx) = mpsc::channel(1);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(config.output_buffer_size);
        let stop_gate = Arc::new(StopGate::new(id));

        debug!(
            watcher_id = id,
            user = %user.name,
            known = known_projects.len(),
            initial = initial_projects.len(),
            buffer_size = config.buffer_size,
            "project watcher created"
        );

        let relay = Relay {
            watcher_id: id,
            incoming: incoming_rx,
            errors: error_rx,
            outgoing: outgoing_tx,
            initial_projects,
            cancel: stop_gate.cancel.clone(),
            cache: Arc::downgrade(&cache),
        };
        runtime.spawn(relay.run());

        let watcher = Arc::new(Self {
            id,
            user,
            incoming: incoming_tx,
            error_slot: error_tx,
            known_projects: Mutex::new(known_projects),
            stop_gate: stop_gate.clone(),
            lookup,
            cache: Arc::downgrade(&cache),
        });

        let stream = WatchStream {
            watcher_id: id,
            receiver: outgoing_rx,
            stop: StopHandle(stop_gate),
        };

        Ok((watcher, stream))
    }

    /// Build a watcher, register it with `cache` and return the consumer side.
    pub fn watch(
        user: UserInfo,
        include_existing: Option<bool>,
        lookup: Arc<dyn ProjectLookup>,
        cache: Arc<dyn WatchableCache>,
        config: &WatchConfig,
    ) -> Result<WatchStream> {
        let (watcher, stream) = Self::new(user, include_existing, lookup, cache.clone(), config)?;
        cache.add_watcher(watcher);
        Ok(stream)
    }

    pub fn user(&self) -> &UserInfo {
        &self.user
    }

    /// Names currently believed visible, sorted
    pub fn known_projects(&self) -> Vec<String> {
        let mut names: Vec<String> = self.known_projects.lock().iter().cloned().collect();
        names.sort();
        names
    }

    pub fn stop(&self) {
        self.stop_gate.stop();
    }

    fn on_access_removed(
        &self,
        namespace: &str,
    ) {
        if !self.known_projects.lock().remove(namespace) {
            return;
        }

        self.enqueue(
            WatchEvent::Deleted(Project::named(namespace)),
            WatchError::DeleteNotificationTimeout,
        );
    }

    fn on_access_granted(
        &self,
        namespace: &str,
    ) {
        let resolved = match self.lookup.get_namespace(namespace) {
            Ok(ns) => ns,
            Err(e) => {
                WATCH_LOOKUP_FAILURES_TOTAL.inc();
                warn!(watcher_id = self.id, namespace, error = %e, "skipping membership change");
                return;
            }
        };
        let project = Project::from(&resolved);

        // Already known means we are notified because the object changed.
        let newly_visible = self.known_projects.lock().insert(namespace.to_string());
        let event = if newly_visible {
            WatchEvent::Added(project)
        } else {
            WatchEvent::Modified(project)
        };

        self.enqueue(event, WatchError::AddNotificationTimeout);
    }

    fn enqueue(
        &self,
        event: WatchEvent,
        overflow: WatchError,
    ) {
        match self.incoming.try_send(event) {
            Ok(()) => {
                trace!(watcher_id = self.id, "event queued");
            }
            Err(TrySendError::Full(event)) => {
                warn!(
                    watcher_id = self.id,
                    user = %self.user.name,
                    event_type = ?event.event_type(),
                    error = %overflow,
                    "intake buffer full, dropping watcher"
                );
                WATCH_OVERFLOW_TOTAL.with_label_values(&[overflow.kind()]).inc();

                // So we won't be notified again.
                deregister(&self.cache, self.id);
                if self.error_slot.try_send(overflow).is_err() {
                    debug!(watcher_id = self.id, "terminal error already recorded");
                }
            }
            Err(TrySendError::Closed(_)) => {
                // Relay already finished and deregistered; make sure we stay gone.
                trace!(watcher_id = self.id, "relay closed, discarding event");
                deregister(&self.cache, self.id);
            }
        }
    }
}

impl CacheWatcher for ProjectWatcher {
    fn id(&self) -> WatcherId {
        self.id
    }

    fn group_membership_changed(
        &self,
        change: &MembershipChange,
    ) {
        let has_access = self.user.is_in(&change.latest_users, &change.latest_groups);
        let removed =
            !has_access && self.user.is_in(&change.removed_users, &change.removed_groups);

        if removed {
            self.on_access_removed(&change.namespace);
        } else if has_access {
            self.on_access_granted(&change.namespace);
        }
    }
}

/// Remove `id` from the cache unless the cache is already gone.
fn deregister(
    cache: &Weak<dyn WatchableCache>,
    id: WatcherId,
) {
    match cache.upgrade() {
        Some(cache) => cache.remove_watcher(id),
        None => trace!(watcher_id = id, "cache already dropped"),
    }
}

fn resolve_initial_projects(
    user: &UserInfo,
    names: &[String],
    lookup: &dyn ProjectLookup,
) -> Vec<Project> {
    names
        .iter()
        .filter_map(|name| match lookup.get_namespace(name) {
            Ok(ns) => Some(Project::from(&ns)),
            Err(e) => {
                WATCH_LOOKUP_FAILURES_TOTAL.inc();
                warn!(user = %user.name, namespace = %name, error = %e, "leaving namespace out of initial snapshot");
                None
            }
        })
        .collect()
}

/// Why a relay task ended
#[derive(Debug, PartialEq, Eq)]
enum RelayExit {
    Stopped,
    ConsumerGone,
    ProducerGone,
    Failed(WatchError),
}

struct Relay {
    watcher_id: WatcherId,
    incoming: mpsc::Receiver<WatchEvent>,
    errors: mpsc::Receiver<WatchError>,
    outgoing: mpsc::Sender<WatchEvent>,
    initial_projects: Vec<Project>,
    cancel: CancellationToken,
    cache: Weak<dyn WatchableCache>,
}

impl Relay {
    async fn run(mut self) {
        WATCH_ACTIVE_WATCHERS.inc();

        let exit = self.relay().await;
        debug!(watcher_id = self.watcher_id, ?exit, "project watch finished");

        // Always deregister when the watch ends to avoid leaking.
        deregister(&self.cache, self.watcher_id);
        WATCH_ACTIVE_WATCHERS.dec();
        // Dropping `self.outgoing` closes the consumer stream.
    }

    async fn relay(&mut self) -> RelayExit {
        for project in std::mem::take(&mut self.initial_projects) {
            if let Ok(err) = self.errors.try_recv() {
                return self.emit_error(err).await;
            }
            if let Err(exit) = self.emit(WatchEvent::Added(project)).await {
                return exit;
            }
        }

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return RelayExit::Stopped,

                event = self.incoming.recv() => {
                    let Some(event) = event else {
                        return match self.errors.try_recv() {
                            Ok(err) => self.emit_error(err).await,
                            Err(_) => RelayExit::ProducerGone,
                        };
                    };

                    let depth = self.incoming.len();
                    if WATCH_CHANNEL_HWM.update(depth) {
                        WATCH_CHANNEL_HIGH_WATER_MARK.set(depth as i64);
                        debug!("watch: {} objects queued in project cache watching channel.", depth);
                    }

                    if let Err(exit) = self.emit(event).await {
                        return exit;
                    }
                }

                Some(err) = self.errors.recv() => return self.emit_error(err).await,
            }
        }
    }

    /// Send one event to the consumer unless stopped first.
    async fn emit(
        &self,
        event: WatchEvent,
    ) -> std::result::Result<(), RelayExit> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RelayExit::Stopped),
            sent = self.outgoing.send(event) => sent.map_err(|_| RelayExit::ConsumerGone),
        }
    }

    async fn emit_error(
        &self,
        err: WatchError,
    ) -> RelayExit {
        match self.emit(WatchEvent::from_error(&err)).await {
            Ok(()) => RelayExit::Failed(err),
            Err(exit) => exit,
        }
    }
}

#[derive(Debug)]
struct StopGate {
    watcher_id: WatcherId,
    cancel: CancellationToken,
    // Keeps parallel stops from racing past the check.
    lock: Mutex<()>,
}

impl StopGate {
    fn new(watcher_id: WatcherId) -> Self {
        Self {
            watcher_id,
            cancel: CancellationToken::new(),
            lock: Mutex::new(()),
        }
    }

    fn stop(&self) {
        let _guard = self.lock.lock();
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        debug!(watcher_id = self.watcher_id, "project watch stopped");
    }
}

/// Cloneable, idempotent stop control for a watch
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<StopGate>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.cancel.is_cancelled()
    }
}

/// Consumer side of a project watch.
///
/// Yields events until the relay task ends; an `Error` event is terminal.
/// Dropping the stream stops the watch.
#[derive(Debug)]
pub struct WatchStream {
    watcher_id: WatcherId,
    receiver: mpsc::Receiver<WatchEvent>,
    stop: StopHandle,
}

impl WatchStream {
    pub fn watcher_id(&self) -> WatcherId {
        self.watcher_id
    }

    /// Next event, or `None` once the watch has ended
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.receiver.recv().await
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

impl Stream for WatchStream {
    type Item = WatchEvent;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for WatchStream {
    fn drop(&mut self) {
        self.stop();
    }
}
