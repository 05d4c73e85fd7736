//! The [`Haven`] service handle.
//!
//! Wraps the store in `Arc<Mutex<>>` so the handle can be cloned into every
//! request handler. SQLite work is short and synchronous; the lock is never
//! held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use haven_shared::constants::{DEFAULT_SESSION_TTL_HOURS, VERIFICATION_TTL_HOURS};
use haven_store::{ChangeFeed, Database, Notification, WriteBatch};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::mail::{Mailer, TracingMailer};
use crate::push::{PushGateway, PushMessage, TracingPushGateway};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub session_ttl: Duration,
    pub verification_ttl: Duration,
    /// When false, `register` is refused.
    pub registration_open: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            verification_ttl: Duration::hours(VERIFICATION_TTL_HOURS),
            registration_open: true,
        }
    }
}

#[derive(Clone)]
pub struct Haven {
    db: Arc<Mutex<Database>>,
    feed: ChangeFeed,
    push: Arc<dyn PushGateway>,
    mailer: Arc<dyn Mailer>,
    config: CoreConfig,
}

impl Haven {
    pub fn new(db: Database, config: CoreConfig) -> Self {
        let feed = db.feed().clone();
        Self {
            db: Arc::new(Mutex::new(db)),
            feed,
            push: Arc::new(TracingPushGateway),
            mailer: Arc::new(TracingMailer),
            config,
        }
    }

    /// Service over a fresh in-memory database. Used by tests.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?, CoreConfig::default()))
    }

    pub fn with_push_gateway(mut self, push: Arc<dyn PushGateway>) -> Self {
        self.push = push;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub(crate) fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub(crate) fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| CoreError::BackendUnavailable(format!("Lock poisoned: {e}")))
    }

    /// Commit `batch` atomically on the guard its checks ran under, then
    /// release the lock and hand every notification it created to the push
    /// gateway.
    ///
    /// Callers validate and commit under one guard so no other writer can
    /// slip in between the checks and the batch.
    pub(crate) fn commit_locked(
        &self,
        mut db: MutexGuard<'_, Database>,
        batch: &WriteBatch,
    ) -> Result<()> {
        let changes = db.commit(batch)?;
        drop(db);
        debug!(changes = changes.len(), "batch committed");
        self.dispatch(batch.notifications());
        Ok(())
    }

    fn dispatch<'a>(&self, notifications: impl Iterator<Item = &'a Notification>) {
        for notification in notifications {
            let message = PushMessage::from(notification);
            if let Err(e) = self.push.deliver(&message) {
                warn!(user_id = %message.user_id, error = %e, "push delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::mail::RecordingMailer;
    use crate::push::PushError;
    use crate::requests::tests::member;
    use crate::requests::NewRequest;

    struct Unreachable;

    impl PushGateway for Unreachable {
        fn deliver(&self, _message: &PushMessage) -> std::result::Result<(), PushError> {
            Err(PushError("gateway offline".into()))
        }
    }

    #[test]
    fn push_failure_does_not_fail_the_operation() {
        let mailer = Arc::new(RecordingMailer::new());
        let haven = Haven::in_memory()
            .unwrap()
            .with_mailer(mailer.clone())
            .with_push_gateway(Arc::new(Unreachable));
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        let bob = member(&haven, &mailer, "bob@example.com", "Bob");

        haven
            .submit_request(&alice, NewRequest::friend("bob@example.com"))
            .unwrap();
        assert_eq!(haven.unread_count(&bob).unwrap(), 1);
    }

    #[test]
    fn accounts_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("haven.db");
        let mailer = Arc::new(RecordingMailer::new());

        {
            let haven = Haven::new(Database::open_at(&path).unwrap(), CoreConfig::default())
                .with_mailer(mailer.clone());
            member(&haven, &mailer, "alice@example.com", "Alice");
        }

        let haven = Haven::new(Database::open_at(&path).unwrap(), CoreConfig::default());
        let session = haven.sign_in("alice@example.com", "secret1").unwrap();
        assert_eq!(haven.authenticate(&session.token).unwrap().email, "alice@example.com");
    }
}
