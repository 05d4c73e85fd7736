//! Relationship kinds, family roles and the reciprocal-role table.
//!
//! A family request carries the role the *target* plays for the requester
//! ("wants to add you as their Parent"). The acceptor's edge back to the
//! requester carries the reciprocal role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Friend,
    Family,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Friend => "friend",
            Self::Family => "family",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "friend" => Ok(Self::Friend),
            "family" => Ok(Self::Family),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FamilyRole {
    Parent,
    Sibling,
    Spouse,
    Child,
    Grandparent,
    Grandchild,
    #[serde(rename = "Aunt/Uncle")]
    AuntUncle,
    Cousin,
    Other,
    /// Only ever produced as the reciprocal of [`FamilyRole::AuntUncle`].
    #[serde(rename = "Niece/Nephew")]
    NieceNephew,
}

impl FamilyRole {
    /// Roles a requester may pick when sending a family request.
    pub const SELECTABLE: [FamilyRole; 9] = [
        FamilyRole::Parent,
        FamilyRole::Sibling,
        FamilyRole::Spouse,
        FamilyRole::Child,
        FamilyRole::Grandparent,
        FamilyRole::Grandchild,
        FamilyRole::AuntUncle,
        FamilyRole::Cousin,
        FamilyRole::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Parent => "Parent",
            Self::Sibling => "Sibling",
            Self::Spouse => "Spouse",
            Self::Child => "Child",
            Self::Grandparent => "Grandparent",
            Self::Grandchild => "Grandchild",
            Self::AuntUncle => "Aunt/Uncle",
            Self::Cousin => "Cousin",
            Self::Other => "Other",
            Self::NieceNephew => "Niece/Nephew",
        }
    }

    /// The role that applies in the inverse direction.
    pub fn reciprocal(&self) -> FamilyRole {
        match self {
            Self::Parent => Self::Child,
            Self::Child => Self::Parent,
            Self::Sibling => Self::Sibling,
            Self::Spouse => Self::Spouse,
            Self::Grandparent => Self::Grandchild,
            Self::Grandchild => Self::Grandparent,
            Self::AuntUncle => Self::NieceNephew,
            Self::NieceNephew => Self::AuntUncle,
            Self::Cousin => Self::Cousin,
            Self::Other => Self::Other,
        }
    }

    pub fn is_selectable(&self) -> bool {
        Self::SELECTABLE.contains(self)
    }

    /// Parse a role a requester picked. Rejects reciprocal-only roles.
    pub fn parse_selectable(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingRelationship);
        }
        let role: FamilyRole = trimmed.parse()?;
        if role.is_selectable() {
            Ok(role)
        } else {
            Err(ValidationError::UnknownRelationship(trimmed.to_string()))
        }
    }
}

impl fmt::Display for FamilyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FamilyRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [
            Self::Parent,
            Self::Sibling,
            Self::Spouse,
            Self::Child,
            Self::Grandparent,
            Self::Grandchild,
            Self::AuntUncle,
            Self::Cousin,
            Self::Other,
            Self::NieceNephew,
        ]
        .into_iter()
        .find(|role| role.label().eq_ignore_ascii_case(s))
        .ok_or_else(|| ValidationError::UnknownRelationship(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}
