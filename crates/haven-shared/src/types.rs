use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidId(s.to_string()))
            }
        }
    };
}

uuid_id!(
    /// Stable identity key of a registered user.
    UserId
);
uuid_id!(RequestId);
uuid_id!(NotificationId);
uuid_id!(CheckInId);

// ---------------------------------------------------------------------------
// Check-in status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CheckInStatus {
    Safe,
    Warning,
    Danger,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }

    /// Wording used in the notification sent to contacts.
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Warning => "NEEDS ATTENTION",
            Self::Danger => "EMERGENCY",
        }
    }
}

impl fmt::Display for CheckInStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckInStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(Self::Safe),
            "warning" => Ok(Self::Warning),
            "danger" => Ok(Self::Danger),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FriendRequest,
    FamilyRequest,
    FriendAccepted,
    FamilyAccepted,
    CheckIn,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FriendRequest => "friend_request",
            Self::FamilyRequest => "family_request",
            Self::FriendAccepted => "friend_accepted",
            Self::FamilyAccepted => "family_accepted",
            Self::CheckIn => "checkin",
        }
    }

    /// Screen a tap on the push notification should open.
    pub fn route(&self) -> PushRoute {
        match self {
            Self::FriendRequest => PushRoute::FriendRequests,
            Self::FamilyRequest => PushRoute::FamilyRequests,
            Self::FriendAccepted | Self::FamilyAccepted => PushRoute::Notifications,
            Self::CheckIn => PushRoute::CheckIn,
        }
    }
}

impl FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friend_request" => Ok(Self::FriendRequest),
            "family_request" => Ok(Self::FamilyRequest),
            "friend_accepted" => Ok(Self::FriendAccepted),
            "family_accepted" => Ok(Self::FamilyAccepted),
            "checkin" => Ok(Self::CheckIn),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PushRoute {
    FriendRequests,
    FamilyRequests,
    CheckIn,
    Notifications,
}

impl PushRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FriendRequests => "friend-requests",
            Self::FamilyRequests => "family-requests",
            Self::CheckIn => "check-in",
            Self::Notifications => "notifications",
        }
    }
}
