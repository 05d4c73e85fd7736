//! Change feed for live queries.
//!
//! Every committed write publishes one [`Change`] per touched document on a
//! `tokio::sync::broadcast` channel. Publishing never blocks; with no
//! subscribers the change is dropped.

use haven_shared::UserId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Requests,
    Contacts,
    Notifications,
    CheckIns,
}

/// A committed write to one document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Change {
    pub collection: Collection,
    pub id: String,
    /// Users whose views of `collection` may have changed.
    pub users: Vec<UserId>,
}

impl Change {
    pub fn new(collection: Collection, id: impl ToString, users: Vec<UserId>) -> Self {
        Self {
            collection,
            id: id.to_string(),
            users,
        }
    }

    pub fn touches(&self, collection: Collection, user: &UserId) -> bool {
        self.collection == collection && self.users.contains(user)
    }
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Change>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish(&self, change: Change) {
        let collection = change.collection;
        if let Ok(n) = self.sender.send(change) {
            debug!(?collection, subscribers = n, "change published");
        }
    }

    pub fn publish_all(&self, changes: impl IntoIterator<Item = Change>) {
        for change in changes {
            self.publish(change);
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscriber_no_panic() {
        let feed = ChangeFeed::default();
        feed.publish(Change::new(Collection::Users, "u1", vec![]));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn every_subscriber_sees_the_change() {
        let feed = ChangeFeed::default();
        let mut rx1 = feed.subscribe();
        let mut rx2 = feed.subscribe();
        let user = UserId::new();

        feed.publish(Change::new(Collection::Notifications, "n1", vec![user]));

        let c1 = rx1.try_recv().unwrap();
        let c2 = rx2.try_recv().unwrap();
        assert_eq!(c1, c2);
        assert!(c1.touches(Collection::Notifications, &user));
        assert!(!c1.touches(Collection::Requests, &user));
    }

    #[test]
    fn clone_shares_channel() {
        let feed = ChangeFeed::default();
        let clone = feed.clone();
        let mut rx = feed.subscribe();

        clone.publish(Change::new(Collection::CheckIns, "c1", vec![]));
        assert_eq!(rx.try_recv().unwrap().id, "c1");
    }
}
