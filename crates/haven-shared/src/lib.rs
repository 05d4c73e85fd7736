//! # haven-shared
//!
//! Types shared by every Haven crate: identifiers, relationship kinds and
//! family roles, check-in statuses, email normalisation, and the static
//! emergency hotline directory.

pub mod constants;
pub mod email;
pub mod error;
pub mod hotlines;
pub mod relationship;
pub mod types;

pub use error::ValidationError;
pub use relationship::{FamilyRole, RelationshipKind, RequestStatus};
pub use types::{CheckInId, CheckInStatus, NotificationId, NotificationKind, PushRoute, RequestId, UserId};
