use std::collections::BTreeMap;
use std::collections::HashSet;

use serde::Serialize;

use crate::constants::PHASE_ACTIVE;
use crate::WatchError;

/// Subscriber identity, fixed for the lifetime of a watcher
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserInfo {
    pub name: String,
    pub groups: Vec<String>,
}

impl UserInfo {
    pub fn new<I, S>(
        name: impl Into<String>,
        groups: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// True when the user is named directly or through any of its groups.
    pub fn is_in(
        &self,
        users: &HashSet<String>,
        groups: &HashSet<String>,
    ) -> bool {
        users.contains(&self.name) || self.groups.iter().any(|g| groups.contains(g))
    }
}

/// Effect of a single change on who may see `namespace`.
///
/// `latest_*` is the full post-change membership; the `removed_*` and
/// `added_*` sets are deltas against the previous membership.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MembershipChange {
    pub namespace: String,
    pub latest_users: HashSet<String>,
    pub latest_groups: HashSet<String>,
    pub removed_users: HashSet<String>,
    pub removed_groups: HashSet<String>,
    pub added_users: HashSet<String>,
    pub added_groups: HashSet<String>,
}

/// Namespace as held by the lookup service
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Namespace {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub phase: String,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: PHASE_ACTIVE.to_string(),
            ..Default::default()
        }
    }

    pub fn with_annotation(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_label(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Client-facing view of a namespace
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Project {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phase: String,
}

impl Project {
    /// A project carrying only its name, as sent with Deleted events.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl From<&Namespace> for Project {
    fn from(namespace: &Namespace) -> Self {
        Self {
            name: namespace.name.clone(),
            labels: namespace.labels.clone(),
            annotations: namespace.annotations.clone(),
            phase: namespace.phase.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusKind {
    Success,
    Failure,
}

/// Payload of an Error event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub status: StatusKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
    Error,
}

/// Event delivered to a watch consumer.
///
/// An `Error` event is always the last one a stream yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum WatchEvent {
    Added(Project),
    Modified(Project),
    Deleted(Project),
    Error(Status),
}

impl WatchEvent {
    pub fn event_type(&self) -> WatchEventType {
        match self {
            WatchEvent::Added(_) => WatchEventType::Added,
            WatchEvent::Modified(_) => WatchEventType::Modified,
            WatchEvent::Deleted(_) => WatchEventType::Deleted,
            WatchEvent::Error(_) => WatchEventType::Error,
        }
    }

    /// Project carried by non-error events
    pub fn project(&self) -> Option<&Project> {
        match self {
            WatchEvent::Added(p) | WatchEvent::Modified(p) | WatchEvent::Deleted(p) => Some(p),
            WatchEvent::Error(_) => None,
        }
    }

    pub(crate) fn from_error(err: &WatchError) -> Self {
        WatchEvent::Error(Status {
            status: StatusKind::Failure,
            message: err.to_string(),
        })
    }
}
