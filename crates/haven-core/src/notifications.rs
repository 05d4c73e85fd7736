//! The notification inbox.

use haven_shared::NotificationId;
use haven_store::{Notification, StoreError};
use serde::Deserialize;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::identity::Actor;
use crate::service::Haven;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Unread,
}

impl Haven {
    /// The actor's notifications, newest first.
    pub fn notifications(&self, actor: &Actor, filter: Filter) -> Result<Vec<Notification>> {
        Ok(self
            .db()?
            .notifications_for(actor.uid, filter == Filter::Unread)?)
    }

    pub fn unread_count(&self, actor: &Actor) -> Result<u64> {
        Ok(self.db()?.unread_count(actor.uid)?)
    }

    /// Mark one notification read. Only its recipient may do so; marking an
    /// already-read notification is a no-op.
    pub fn mark_read(&self, actor: &Actor, id: NotificationId) -> Result<()> {
        let db = self.db()?;
        let notification = match db.get_notification(id) {
            Ok(n) => n,
            Err(StoreError::NotFound) => return Err(CoreError::NotificationNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        if notification.user_id != actor.uid {
            return Err(CoreError::NotAuthorized);
        }
        if db.mark_notification_read(id, actor.uid)? {
            debug!(notification_id = %id, "notification read");
        }
        Ok(())
    }

    /// Returns how many notifications changed.
    pub fn mark_all_read(&self, actor: &Actor) -> Result<usize> {
        Ok(self.db()?.mark_all_notifications_read(actor.uid)?)
    }

    /// Delete every notification addressed to the actor.
    pub fn clear_all(&self, actor: &Actor) -> Result<usize> {
        let removed = self.db()?.delete_notifications_for(actor.uid)?;
        debug!(user_id = %actor.uid, removed, "notifications cleared");
        Ok(removed)
    }
}
