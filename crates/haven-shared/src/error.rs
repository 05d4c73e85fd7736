use thiserror::Error;

/// Input that failed a syntactic or enumerated-value check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Unknown relationship: {0}")]
    UnknownRelationship(String),

    #[error("A relationship is required for family requests")]
    MissingRelationship,

    #[error("Unknown relationship kind: {0}")]
    UnknownKind(String),

    #[error("Unknown check-in status: {0}")]
    UnknownStatus(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is too long (max {max} characters)")]
    TooLong { field: &'static str, max: usize },
}
