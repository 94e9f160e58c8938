use std::collections::HashSet;
use std::time::Duration;

use tokio::time::timeout;

use crate::MembershipChange;
use crate::UserInfo;
use crate::WatchEvent;
use crate::WatchStream;

pub(crate) const TEST_USER: &str = "alice";
pub(crate) const TEST_GROUP: &str = "devs";

pub(crate) const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn test_user() -> UserInfo {
    UserInfo::new(TEST_USER, [TEST_GROUP])
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `TEST_USER` gains (or keeps) direct access to `namespace`
pub(crate) fn grant_user(namespace: &str) -> MembershipChange {
    MembershipChange {
        namespace: namespace.to_string(),
        latest_users: set(&[TEST_USER]),
        added_users: set(&[TEST_USER]),
        ..Default::default()
    }
}

/// `TEST_USER` loses direct access to `namespace`
pub(crate) fn revoke_user(namespace: &str) -> MembershipChange {
    MembershipChange {
        namespace: namespace.to_string(),
        removed_users: set(&[TEST_USER]),
        ..Default::default()
    }
}

/// `TEST_GROUP` gains access to `namespace`
pub(crate) fn grant_group(namespace: &str) -> MembershipChange {
    MembershipChange {
        namespace: namespace.to_string(),
        latest_groups: set(&[TEST_GROUP]),
        added_groups: set(&[TEST_GROUP]),
        ..Default::default()
    }
}

/// `TEST_GROUP` loses access to `namespace`
pub(crate) fn revoke_group(namespace: &str) -> MembershipChange {
    MembershipChange {
        namespace: namespace.to_string(),
        removed_groups: set(&[TEST_GROUP]),
        ..Default::default()
    }
}

/// A change that only concerns other users and groups
pub(crate) fn unrelated_change(namespace: &str) -> MembershipChange {
    MembershipChange {
        namespace: namespace.to_string(),
        latest_users: set(&["bob"]),
        added_users: set(&["bob"]),
        removed_groups: set(&["ops"]),
        ..Default::default()
    }
}

pub(crate) async fn next_event(stream: &mut WatchStream) -> Option<WatchEvent> {
    timeout(RECV_TIMEOUT, stream.recv())
        .await
        .expect("Timeout waiting for event")
}

/// Drain the stream until it closes
pub(crate) async fn drain(stream: &mut WatchStream) -> Vec<WatchEvent> {
    let mut events = Vec::new();
    while let Some(event) = next_event(stream).await {
        events.push(event);
    }
    events
}
