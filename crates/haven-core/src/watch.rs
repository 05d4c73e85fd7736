//! Live queries over the change feed.
//!
//! A [`Subscription`] yields an initial snapshot, then a fresh snapshot
//! whenever a relevant change is committed, until it is cancelled or
//! dropped. Snapshot queries take the store lock and run SQLite, so they
//! run on the blocking pool rather than on the calling task.

use std::sync::Arc;

use haven_shared::{RelationshipKind, UserId};
use haven_store::{Change, ChangeFeed, CheckIn, Collection, Notification, RelationshipRequest};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::identity::Actor;
use crate::notifications::Filter;
use crate::service::Haven;

type Query<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

pub struct Subscription<T> {
    rx: broadcast::Receiver<Change>,
    collection: Collection,
    user: UserId,
    query: Query<T>,
    started: bool,
    cancel: CancellationToken,
}

impl<T: Send + 'static> Subscription<T> {
    /// Subscribe to the feed. No query runs until the first `next()`; any
    /// change committed before then is already queued on the receiver.
    pub fn start(
        feed: &ChangeFeed,
        collection: Collection,
        user: UserId,
        query: impl Fn() -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            rx: feed.subscribe(),
            collection,
            user,
            query: Arc::new(query),
            started: false,
            cancel: CancellationToken::new(),
        }
    }

    /// The next snapshot, or `None` once cancelled.
    ///
    /// The first call returns the initial snapshot. Changes already queued
    /// behind the one that woke us are drained, so one batch yields one
    /// snapshot.
    pub async fn next(&mut self) -> Option<Result<T>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        if !self.started {
            self.started = true;
            self.drain();
            return self.snapshot().await;
        }

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                received = self.rx.recv() => match received {
                    Ok(change) if change.touches(self.collection, &self.user) => break,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, collection = ?self.collection, "subscription lagged");
                        break;
                    }
                    Err(RecvError::Closed) => return None,
                },
            }
        }

        self.drain();
        self.snapshot().await
    }

    fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Run the query on the blocking pool. Cancellation wins over a
    /// snapshot still in flight.
    async fn snapshot(&self) -> Option<Result<T>> {
        let query = Arc::clone(&self.query);
        let task = tokio::task::spawn_blocking(move || query());
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            joined = task => Some(joined.unwrap_or_else(|e| {
                Err(CoreError::Internal(format!("snapshot task failed: {e}")))
            })),
        }
    }

    /// Stop delivery. Subsequent `next()` calls return `None`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that cancels this subscription from another task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Haven {
    pub fn watch_pending_incoming(
        &self,
        actor: &Actor,
        kind: Option<RelationshipKind>,
    ) -> Subscription<Vec<RelationshipRequest>> {
        let haven = self.clone();
        let actor = actor.clone();
        let user = actor.uid;
        Subscription::start(self.feed(), Collection::Requests, user, move || {
            haven.pending_incoming(&actor, kind)
        })
    }

    pub fn watch_history(&self, actor: &Actor, limit: u32) -> Subscription<Vec<CheckIn>> {
        let haven = self.clone();
        let actor = actor.clone();
        let user = actor.uid;
        Subscription::start(self.feed(), Collection::CheckIns, user, move || {
            haven.history(&actor, limit)
        })
    }

    pub fn watch_notifications(
        &self,
        actor: &Actor,
        filter: Filter,
    ) -> Subscription<Vec<Notification>> {
        let haven = self.clone();
        let actor = actor.clone();
        let user = actor.uid;
        Subscription::start(self.feed(), Collection::Notifications, user, move || {
            haven.notifications(&actor, filter)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use haven_shared::CheckInStatus;

    use super::*;
    use crate::requests::tests::{member, service};
    use crate::requests::NewRequest;

    #[tokio::test]
    async fn pending_requests_follow_submit_and_accept() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        let bob = member(&haven, &mailer, "bob@example.com", "Bob");

        let mut sub = haven.watch_pending_incoming(&bob, None);
        assert!(sub.next().await.unwrap().unwrap().is_empty());

        let request = haven
            .submit_request(&alice, NewRequest::friend("bob@example.com"))
            .unwrap();
        let snapshot = sub.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].from_user_id, alice.uid);

        haven.accept(&bob, request.id).unwrap();
        assert!(sub.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unrelated_changes_do_not_wake() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        let bob = member(&haven, &mailer, "bob@example.com", "Bob");

        let mut sub = haven.watch_history(&bob, 10);
        sub.next().await.unwrap().unwrap();

        haven.check_in(&alice, CheckInStatus::Safe, "Home").unwrap();
        let woke = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(woke.is_err());

        haven.check_in(&bob, CheckInStatus::Warning, "Road").unwrap();
        let history = sub.next().await.unwrap().unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn snapshots_wait_out_a_held_lock_without_stalling_the_runtime() {
        let (haven, mailer) = service();
        let bob = member(&haven, &mailer, "bob@example.com", "Bob");
        let mut sub = haven.watch_notifications(&bob, Filter::All);

        // Hold the store lock on another thread while the single-threaded
        // runtime asks for the initial snapshot.
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = {
            let haven = haven.clone();
            std::thread::spawn(move || {
                let _db = haven.db().unwrap();
                locked_tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(200));
            })
        };
        locked_rx.recv().unwrap();

        let started = std::time::Instant::now();
        let snapshot = tokio::spawn(async move { sub.next().await });
        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        });

        // The timer task still runs while the snapshot waits on the lock.
        ticker.await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(150));
        assert!(snapshot.await.unwrap().unwrap().unwrap().is_empty());
        holder.join().unwrap();
    }

    #[tokio::test]
    async fn cancel_stops_delivery() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        let bob = member(&haven, &mailer, "bob@example.com", "Bob");

        let mut sub = haven.watch_notifications(&bob, Filter::All);
        sub.next().await.unwrap().unwrap();

        let token = sub.cancel_token();
        let waiter = tokio::spawn(async move { sub.next().await.is_none() });
        token.cancel();
        assert!(waiter.await.unwrap());

        // Writes after cancellation still succeed.
        haven
            .submit_request(&alice, NewRequest::friend("bob@example.com"))
            .unwrap();
    }
}
