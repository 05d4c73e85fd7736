//! Accepting and rejecting relationship requests.
//!
//! Only the recipient may resolve a request. Accepting writes both
//! directed edges, the request status and the requester's notification in
//! one batch; the status update is conditional on the request still being
//! pending, so a concurrent second resolution aborts the whole batch.

use chrono::{DateTime, Utc};
use haven_shared::{NotificationId, NotificationKind, RelationshipKind, RequestId, RequestStatus};
use haven_store::{
    ContactEdge, Database, Notification, NotificationPayload, RelationshipRequest, StoreError,
    WriteBatch,
};
use tracing::info;

use crate::error::{CoreError, Result};
use crate::identity::Actor;
use crate::requests::actor_name;
use crate::service::Haven;

/// Load `id` and check that `actor` may resolve it.
fn resolvable(db: &Database, actor: &Actor, id: RequestId) -> Result<RelationshipRequest> {
    let request = match db.get_request(id) {
        Ok(request) => request,
        Err(StoreError::NotFound) => return Err(CoreError::RequestNotFound(id)),
        Err(e) => return Err(e.into()),
    };
    if request.to_user_id != actor.uid {
        return Err(CoreError::NotAuthorized);
    }
    if request.status.is_terminal() {
        return Err(CoreError::RequestAlreadyResolved(id));
    }
    Ok(request)
}

/// The two directed edges an accepted request materialises.
///
/// The requester's edge carries the label as stated in the request plus the
/// requester's nickname and phone; the acceptor's edge carries the
/// reciprocal label.
fn edge_pair(
    request: &RelationshipRequest,
    acceptor: &Actor,
    at: DateTime<Utc>,
) -> (ContactEdge, ContactEdge) {
    let to_acceptor = ContactEdge {
        owner_id: request.from_user_id,
        target_id: request.to_user_id,
        target_name: actor_name(acceptor).to_string(),
        target_email: acceptor.email.clone(),
        kind: request.kind,
        relationship: request.relationship,
        nickname: request.nickname.clone(),
        phone: request.phone.clone(),
        can_track: true,
        added_at: at,
    };
    let to_requester = ContactEdge {
        owner_id: request.to_user_id,
        target_id: request.from_user_id,
        target_name: request.from_user_name.clone(),
        target_email: request.from_user_email.clone(),
        kind: request.kind,
        relationship: request.relationship.map(|r| r.reciprocal()),
        nickname: None,
        phone: None,
        can_track: true,
        added_at: at,
    };
    (to_acceptor, to_requester)
}

fn accepted_notification(
    request: &RelationshipRequest,
    acceptor: &Actor,
    at: DateTime<Utc>,
) -> Notification {
    let name = actor_name(acceptor);
    let (kind, title, noun) = match request.kind {
        RelationshipKind::Friend => (
            NotificationKind::FriendAccepted,
            "Friend Request Accepted",
            "friend",
        ),
        RelationshipKind::Family => (
            NotificationKind::FamilyAccepted,
            "Family Request Accepted",
            "family",
        ),
    };
    Notification {
        id: NotificationId::new(),
        user_id: request.from_user_id,
        kind,
        title: title.to_string(),
        message: format!("{name} accepted your {noun} request"),
        from_user_id: Some(acceptor.uid),
        from_user_name: Some(name.to_string()),
        read: false,
        created_at: at,
        payload: NotificationPayload {
            request_id: Some(request.id),
            relationship: request.relationship,
            ..Default::default()
        },
    }
}

impl Haven {
    /// Accept a pending request addressed to `actor`.
    ///
    /// A pending request of the same kind in the opposite direction is
    /// accepted in the same batch, since it would otherwise be left pending
    /// for a pair that is already connected.
    pub fn accept(&self, actor: &Actor, id: RequestId) -> Result<RelationshipRequest> {
        let now = Utc::now();
        let db = self.db()?;
        let request = resolvable(&db, actor, id)?;
        let reverse =
            db.pending_request_between(request.to_user_id, request.from_user_id, request.kind)?;

        let (to_acceptor, to_requester) = edge_pair(&request, actor, now);
        // The conditional status update goes first so a lost race fails
        // as already resolved rather than on the edge key.
        let mut batch = WriteBatch::new();
        batch.resolve_request(&request, RequestStatus::Accepted, now);
        if let Some(reverse) = &reverse {
            batch.resolve_request(reverse, RequestStatus::Accepted, now);
        }
        batch
            .insert_edge(to_acceptor)
            .insert_edge(to_requester)
            .insert_notification(accepted_notification(&request, actor, now));

        self.commit_locked(db, &batch)?;
        info!(
            request_id = %id,
            kind = %request.kind,
            from = %request.from_user_id,
            to = %request.to_user_id,
            "relationship request accepted"
        );

        Ok(RelationshipRequest {
            status: RequestStatus::Accepted,
            resolved_at: Some(now),
            ..request
        })
    }

    /// Reject a pending request addressed to `actor`. The requester is not
    /// notified.
    pub fn reject(&self, actor: &Actor, id: RequestId) -> Result<RelationshipRequest> {
        let now = Utc::now();
        let db = self.db()?;
        let request = resolvable(&db, actor, id)?;

        let mut batch = WriteBatch::new();
        batch.resolve_request(&request, RequestStatus::Rejected, now);
        self.commit_locked(db, &batch)?;
        info!(request_id = %id, kind = %request.kind, "relationship request rejected");

        Ok(RelationshipRequest {
            status: RequestStatus::Rejected,
            resolved_at: Some(now),
            ..request
        })
    }
}
