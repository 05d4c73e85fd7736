//! Request lifecycle: validating and submitting relationship requests,
//! and the read side of requests and contacts.

use chrono::Utc;
use haven_shared::constants::{FALLBACK_ACTOR_NAME, MAX_FIELD_LEN};
use haven_shared::{
    email, FamilyRole, NotificationId, NotificationKind, RelationshipKind, RequestId,
    RequestStatus, ValidationError,
};
use haven_store::{ContactEdge, Notification, NotificationPayload, RelationshipRequest, WriteBatch};
use serde::Deserialize;
use tracing::info;

use crate::error::{CoreError, Result};
use crate::identity::{display_name_of, Actor};
use crate::service::Haven;

/// A proposal to link with the user registered under `target_email`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub kind: RelationshipKind,
    pub target_email: String,
    /// Role the target plays for the requester. Required for family.
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewRequest {
    pub fn friend(target_email: impl Into<String>) -> Self {
        Self {
            kind: RelationshipKind::Friend,
            target_email: target_email.into(),
            relationship: None,
            nickname: None,
            phone: None,
        }
    }

    pub fn family(target_email: impl Into<String>, relationship: impl Into<String>) -> Self {
        Self {
            kind: RelationshipKind::Family,
            relationship: Some(relationship.into()),
            ..Self::friend(target_email)
        }
    }
}

pub(crate) fn actor_name(actor: &Actor) -> &str {
    let name = actor.display_name.trim();
    if name.is_empty() {
        FALLBACK_ACTOR_NAME
    } else {
        name
    }
}

fn optional_text(field: &'static str, value: Option<String>) -> Result<Option<String>> {
    let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    if let Some(v) = &value {
        if v.chars().count() > MAX_FIELD_LEN {
            return Err(ValidationError::TooLong {
                field,
                max: MAX_FIELD_LEN,
            }
            .into());
        }
    }
    Ok(value)
}

fn request_notification(actor: &Actor, request: &RelationshipRequest) -> Notification {
    let name = actor_name(actor);
    let (kind, title, message) = match (request.kind, request.relationship) {
        (RelationshipKind::Family, Some(role)) => (
            NotificationKind::FamilyRequest,
            "New Family Request",
            format!("{name} wants to add you as their {}", role.label()),
        ),
        (RelationshipKind::Family, None) => (
            NotificationKind::FamilyRequest,
            "New Family Request",
            format!("{name} wants to add you as family"),
        ),
        (RelationshipKind::Friend, _) => (
            NotificationKind::FriendRequest,
            "New Friend Request",
            format!("{name} wants to add you as a friend"),
        ),
    };

    Notification {
        id: NotificationId::new(),
        user_id: request.to_user_id,
        kind,
        title: title.to_string(),
        message,
        from_user_id: Some(actor.uid),
        from_user_name: Some(name.to_string()),
        read: false,
        created_at: request.created_at,
        payload: NotificationPayload {
            request_id: Some(request.id),
            relationship: request.relationship,
            ..Default::default()
        },
    }
}

impl Haven {
    /// Validate and submit a relationship request. The request and the
    /// recipient's notification are committed together.
    ///
    /// Checks run in a fixed order, each with its own error: email syntax
    /// and family label, self reference, unknown target, existing
    /// connection, duplicate pending request.
    pub fn submit_request(&self, actor: &Actor, new: NewRequest) -> Result<RelationshipRequest> {
        let target_email = email::parse(&new.target_email)?;
        let relationship = match new.kind {
            RelationshipKind::Family => Some(FamilyRole::parse_selectable(
                new.relationship.as_deref().unwrap_or(""),
            )?),
            RelationshipKind::Friend => None,
        };
        let nickname = optional_text("nickname", new.nickname)?;
        let phone = optional_text("phone", new.phone)?;

        if target_email == email::normalize(&actor.email) {
            return Err(CoreError::SelfReference);
        }

        let db = self.db()?;
        let request = {
            let target = db
                .find_user_by_email(&target_email)?
                .ok_or_else(|| CoreError::TargetNotFound(target_email.clone()))?;
            if target.id == actor.uid {
                return Err(CoreError::SelfReference);
            }
            if db.connected(actor.uid, target.id, new.kind)? {
                return Err(CoreError::AlreadyConnected);
            }
            if db
                .pending_request_between(actor.uid, target.id, new.kind)?
                .is_some()
            {
                return Err(CoreError::DuplicateRequest);
            }

            RelationshipRequest {
                id: RequestId::new(),
                kind: new.kind,
                from_user_id: actor.uid,
                from_user_name: actor_name(actor).to_string(),
                from_user_email: actor.email.clone(),
                to_user_id: target.id,
                to_user_name: display_name_of(&target).to_string(),
                to_user_email: target.email.clone(),
                relationship,
                nickname,
                phone,
                status: RequestStatus::Pending,
                created_at: Utc::now(),
                resolved_at: None,
            }
        };

        let mut batch = WriteBatch::new();
        batch
            .insert_notification(request_notification(actor, &request))
            .insert_request(request.clone());
        self.commit_locked(db, &batch)?;

        info!(
            request_id = %request.id,
            kind = %request.kind,
            from = %request.from_user_id,
            to = %request.to_user_id,
            "relationship request submitted"
        );
        Ok(request)
    }

    /// Pending requests addressed to the actor, newest first.
    pub fn pending_incoming(
        &self,
        actor: &Actor,
        kind: Option<RelationshipKind>,
    ) -> Result<Vec<RelationshipRequest>> {
        Ok(self.db()?.pending_requests_to(actor.uid, kind)?)
    }

    /// Pending requests the actor sent, newest first.
    pub fn pending_outgoing(
        &self,
        actor: &Actor,
        kind: Option<RelationshipKind>,
    ) -> Result<Vec<RelationshipRequest>> {
        Ok(self.db()?.pending_requests_from(actor.uid, kind)?)
    }

    /// The actor's contact list, ordered by name.
    pub fn contacts(
        &self,
        actor: &Actor,
        kind: Option<RelationshipKind>,
    ) -> Result<Vec<ContactEdge>> {
        Ok(self.db()?.list_contacts(actor.uid, kind)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mail::RecordingMailer;

    /// Register and verify `email`, returning the signed-in actor.
    pub(crate) fn member(haven: &Haven, mailer: &RecordingMailer, email: &str, name: &str) -> Actor {
        haven.register(email, "secret1", name).unwrap();
        let token = mailer.last_token_for(email).unwrap();
        haven.verify_email(&token).unwrap();
        let session = haven.sign_in(email, "secret1").unwrap();
        haven.authenticate(&session.token).unwrap()
    }

    pub(crate) fn service() -> (Haven, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::new());
        let haven = Haven::in_memory().unwrap().with_mailer(mailer.clone());
        (haven, mailer)
    }

    #[test]
    fn submit_writes_request_and_notification() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        let bob = member(&haven, &mailer, "bob@example.com", "Bob");

        let mut new = NewRequest::family("BOB@example.com", "Parent");
        new.nickname = Some(" Dad ".into());
        let request = haven.submit_request(&alice, new).unwrap();
        assert_eq!(request.to_user_id, bob.uid);
        assert_eq!(request.relationship, Some(FamilyRole::Parent));
        assert_eq!(request.nickname.as_deref(), Some("Dad"));

        let inbox = haven.notifications(&bob, crate::notifications::Filter::All).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "New Family Request");
        assert_eq!(inbox[0].message, "Alice wants to add you as their Parent");
        assert_eq!(inbox[0].payload.request_id, Some(request.id));

        let outgoing = haven.pending_outgoing(&alice, None).unwrap();
        assert_eq!(outgoing.len(), 1);
        assert!(haven.pending_incoming(&alice, None).unwrap().is_empty());
    }

    #[test]
    fn validation_order_is_stable() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");

        // Syntax is checked before anything else, even for the own address.
        assert!(matches!(
            haven.submit_request(&alice, NewRequest::friend("alice@")),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            haven.submit_request(&alice, NewRequest::friend(" Alice@Example.com ")),
            Err(CoreError::SelfReference)
        ));
        assert!(matches!(
            haven.submit_request(&alice, NewRequest::friend("ghost@example.com")),
            Err(CoreError::TargetNotFound(addr)) if addr == "ghost@example.com"
        ));
    }

    #[test]
    fn unreadable_request_row_is_not_retryable() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        let bob = member(&haven, &mailer, "bob@example.com", "Bob");
        haven
            .submit_request(&alice, NewRequest::friend("bob@example.com"))
            .unwrap();

        haven
            .db()
            .unwrap()
            .conn()
            .execute("UPDATE relationship_requests SET kind = 'enemy'", [])
            .unwrap();

        let err = haven.pending_incoming(&bob, None).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)), "{err}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn family_requests_need_a_selectable_label() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        member(&haven, &mailer, "bob@example.com", "Bob");

        for label in ["", "Niece/Nephew", "Landlord"] {
            let err = haven
                .submit_request(&alice, NewRequest::family("bob@example.com", label))
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidInput(_)), "{label}: {err}");
        }
    }

    #[test]
    fn friend_and_family_are_independent() {
        let (haven, mailer) = service();
        let alice = member(&haven, &mailer, "alice@example.com", "Alice");
        member(&haven, &mailer, "bob@example.com", "Bob");

        haven
            .submit_request(&alice, NewRequest::friend("bob@example.com"))
            .unwrap();
        haven
            .submit_request(&alice, NewRequest::family("bob@example.com", "Cousin"))
            .unwrap();
        assert_eq!(haven.pending_outgoing(&alice, None).unwrap().len(), 2);
        assert_eq!(
            haven
                .pending_outgoing(&alice, Some(RelationshipKind::Family))
                .unwrap()
                .len(),
            1
        );
    }
}
