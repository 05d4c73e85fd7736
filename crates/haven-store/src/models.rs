//! Domain model structs persisted in the Haven database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer.

use chrono::{DateTime, Utc};
use haven_shared::{
    CheckInId, CheckInStatus, FamilyRole, NotificationId, NotificationKind, RelationshipKind,
    RequestId, RequestStatus, UserId,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered user. Credentials live in a separate column set and are
/// never loaded into this struct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Normalised (trimmed, lowercase) email address. Unique.
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Durable URL of the profile photo in the object store.
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a user may change on their own profile. `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub photo_url: Option<String>,
}

/// Password hash and verification flag, looked up at sign-in.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: UserId,
    pub password_hash: String,
    pub email_verified: bool,
}

// ---------------------------------------------------------------------------
// Sessions / email verification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVerification {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Relationship request
// ---------------------------------------------------------------------------

/// A proposal from one user to link with another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipRequest {
    pub id: RequestId,
    pub kind: RelationshipKind,
    pub from_user_id: UserId,
    pub from_user_name: String,
    pub from_user_email: String,
    pub to_user_id: UserId,
    pub to_user_name: String,
    pub to_user_email: String,
    /// Role the recipient plays for the requester. Family requests only.
    pub relationship: Option<FamilyRole>,
    /// Requester-local nickname for the recipient.
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Contact edge
// ---------------------------------------------------------------------------

/// "`owner_id` has `target_id` in their contact list."
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactEdge {
    pub owner_id: UserId,
    pub target_id: UserId,
    pub target_name: String,
    pub target_email: String,
    pub kind: RelationshipKind,
    /// Role the target plays for the owner. Family edges only.
    pub relationship: Option<FamilyRole>,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub can_track: bool,
    pub added_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// Optional fields carried by some notification kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<FamilyRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CheckInStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub from_user_id: Option<UserId>,
    pub from_user_name: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub payload: NotificationPayload,
}

// ---------------------------------------------------------------------------
// Check-in
// ---------------------------------------------------------------------------

/// A point-in-time status broadcast. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckIn {
    pub id: CheckInId,
    pub user_id: UserId,
    pub user_name: String,
    pub status: CheckInStatus,
    pub location: String,
    pub created_at: DateTime<Utc>,
}
