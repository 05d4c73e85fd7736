//! Check-in broadcast.
//!
//! A check-in is stored together with one notification per distinct
//! contact, all in a single batch: either every contact is notified or the
//! check-in does not exist.

use chrono::Utc;
use haven_shared::constants::{MAX_FIELD_LEN, UNKNOWN_LOCATION};
use haven_shared::{CheckInId, CheckInStatus, NotificationId, NotificationKind, ValidationError};
use haven_store::{CheckIn, Notification, NotificationPayload, WriteBatch};
use tracing::info;

use crate::error::Result;
use crate::identity::Actor;
use crate::requests::actor_name;
use crate::service::Haven;

fn location_label(location: &str) -> Result<String> {
    let location = location.trim();
    if location.is_empty() {
        return Ok(UNKNOWN_LOCATION.to_string());
    }
    if location.chars().count() > MAX_FIELD_LEN {
        return Err(ValidationError::TooLong {
            field: "location",
            max: MAX_FIELD_LEN,
        }
        .into());
    }
    Ok(location.to_string())
}

impl Haven {
    /// Record the actor's status and notify every contact once.
    pub fn check_in(&self, actor: &Actor, status: CheckInStatus, location: &str) -> Result<CheckIn> {
        let location = location_label(location)?;
        let name = actor_name(actor).to_string();
        let check_in = CheckIn {
            id: CheckInId::new(),
            user_id: actor.uid,
            user_name: name.clone(),
            status,
            location,
            created_at: Utc::now(),
        };

        // Edges are bidirectional, so the actor's own targets are exactly
        // the users who have the actor as a contact.
        let db = self.db()?;
        let recipients = db.contact_ids(actor.uid)?;

        let message = format!(
            "{name} checked in as {} from {}",
            status.headline(),
            check_in.location
        );
        let mut batch = WriteBatch::new();
        batch.insert_check_in(check_in.clone());
        for recipient in &recipients {
            batch.insert_notification(Notification {
                id: NotificationId::new(),
                user_id: *recipient,
                kind: NotificationKind::CheckIn,
                title: "Check-In Update".to_string(),
                message: message.clone(),
                from_user_id: Some(actor.uid),
                from_user_name: Some(name.clone()),
                read: false,
                created_at: check_in.created_at,
                payload: NotificationPayload {
                    status: Some(status),
                    location: Some(check_in.location.clone()),
                    ..Default::default()
                },
            });
        }
        self.commit_locked(db, &batch)?;

        info!(
            user_id = %actor.uid,
            status = status.as_str(),
            notified = recipients.len(),
            "check-in broadcast"
        );
        Ok(check_in)
    }

    /// The actor's check-ins, newest first.
    pub fn history(&self, actor: &Actor, limit: u32) -> Result<Vec<CheckIn>> {
        Ok(self.db()?.check_ins_for(actor.uid, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::Filter;
    use crate::requests::tests::{member, service};
    use crate::requests::NewRequest;

    #[test]
    fn check_in_without_contacts_stores_history_only() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");

        let check_in = haven.check_in(&alice, CheckInStatus::Safe, "  ").unwrap();
        assert_eq!(check_in.location, UNKNOWN_LOCATION);

        let history = haven.history(&alice, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, check_in.id);
    }

    #[test]
    fn contact_in_both_lists_is_notified_once() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        let bob = member(&haven, &mailer, "bob@example.com", "Bob");

        let friend = haven
            .submit_request(&alice, NewRequest::friend("bob@example.com"))
            .unwrap();
        let family = haven
            .submit_request(&alice, NewRequest::family("bob@example.com", "Sibling"))
            .unwrap();
        haven.accept(&bob, friend.id).unwrap();
        haven.accept(&bob, family.id).unwrap();
        haven.clear_all(&bob).unwrap();

        haven
            .check_in(&alice, CheckInStatus::Danger, "Barangay Hall")
            .unwrap();

        let inbox = haven.notifications(&bob, Filter::All).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "Check-In Update");
        assert_eq!(
            inbox[0].message,
            "Alice checked in as EMERGENCY from Barangay Hall"
        );
        assert_eq!(inbox[0].payload.status, Some(CheckInStatus::Danger));
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        haven.check_in(&alice, CheckInStatus::Safe, "Home").unwrap();
        haven.check_in(&alice, CheckInStatus::Warning, "Road").unwrap();
        haven.check_in(&alice, CheckInStatus::Danger, "River").unwrap();

        let history = haven.history(&alice, 2).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].location, "River");
        assert_eq!(history[1].location, "Road");
    }
}
