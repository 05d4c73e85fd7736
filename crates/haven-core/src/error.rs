use haven_shared::{NotificationId, RequestId, ValidationError};
use haven_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Coarse grouping used to tell the user "you can't do that" apart from
/// "try again".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Validation,
    Auth,
    Transient,
    Internal,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("You cannot add yourself")]
    SelfReference,

    #[error("No user found with email {0}. They need to create an account first.")]
    TargetNotFound(String),

    #[error("This person is already in your contacts")]
    AlreadyConnected,

    #[error("You already sent a request to this person")]
    DuplicateRequest,

    #[error("Request {0} not found")]
    RequestNotFound(RequestId),

    #[error("Request {0} was already resolved")]
    RequestAlreadyResolved(RequestId),

    #[error("You are not allowed to do that")]
    NotAuthorized,

    #[error("Notification {0} not found")]
    NotificationNotFound(NotificationId),

    #[error("User not found")]
    UserNotFound,

    #[error("This email is already registered")]
    EmailAlreadyRegistered,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Please verify your email before signing in")]
    EmailNotVerified,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Not signed in or session expired")]
    Unauthenticated,

    #[error("Service temporarily unavailable, please try again: {0}")]
    BackendUnavailable(String),

    /// Stored data could not be read back, or a store call failed in a way
    /// retrying will not fix.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::BackendUnavailable(_) => ErrorClass::Transient,
            CoreError::Internal(_) => ErrorClass::Internal,
            CoreError::InvalidCredentials
            | CoreError::EmailNotVerified
            | CoreError::Unauthenticated => ErrorClass::Auth,
            _ => ErrorClass::Validation,
        }
    }

    /// Only transient failures are safe to retry: a failed batch leaves no
    /// partial state behind.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::SelfReference => "self_reference",
            CoreError::TargetNotFound(_) => "target_not_found",
            CoreError::AlreadyConnected => "already_connected",
            CoreError::DuplicateRequest => "duplicate_request",
            CoreError::RequestNotFound(_) => "request_not_found",
            CoreError::RequestAlreadyResolved(_) => "request_already_resolved",
            CoreError::NotAuthorized => "not_authorized",
            CoreError::NotificationNotFound(_) => "notification_not_found",
            CoreError::UserNotFound => "user_not_found",
            CoreError::EmailAlreadyRegistered => "email_already_registered",
            CoreError::InvalidCredentials => "invalid_credentials",
            CoreError::EmailNotVerified => "email_not_verified",
            CoreError::AlreadyVerified => "already_verified",
            CoreError::Unauthenticated => "unauthenticated",
            CoreError::BackendUnavailable(_) => "backend_unavailable",
            CoreError::Internal(_) => "internal",
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::InvalidInput(err.to_string())
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePending => CoreError::DuplicateRequest,
            StoreError::EdgeExists => CoreError::AlreadyConnected,
            StoreError::EmailTaken => CoreError::EmailAlreadyRegistered,
            StoreError::RequestNotPending(id) => CoreError::RequestAlreadyResolved(id),
            other if other.is_unavailable() => {
                tracing::warn!(error = %other, "store unavailable");
                CoreError::BackendUnavailable(other.to_string())
            }
            other => {
                tracing::error!(error = %other, "store failure");
                CoreError::Internal(other.to_string())
            }
        }
    }
}

/// For lookups keyed by a user id: a missing row is a missing user.
pub(crate) fn user_lookup(err: StoreError) -> CoreError {
    match err {
        StoreError::NotFound => CoreError::UserNotFound,
        other => other.into(),
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backend_failures_are_retryable() {
        assert!(CoreError::BackendUnavailable("locked".into()).is_retryable());
        assert!(!CoreError::DuplicateRequest.is_retryable());
        assert!(!CoreError::NotAuthorized.is_retryable());
        assert_eq!(CoreError::Unauthenticated.class(), ErrorClass::Auth);
    }

    #[test]
    fn store_constraint_errors_map_to_domain_errors() {
        assert!(matches!(
            CoreError::from(StoreError::DuplicatePending),
            CoreError::DuplicateRequest
        ));
        assert!(matches!(
            CoreError::from(StoreError::EdgeExists),
            CoreError::AlreadyConnected
        ));
        let id = RequestId::new();
        assert!(matches!(
            CoreError::from(StoreError::RequestNotPending(id)),
            CoreError::RequestAlreadyResolved(got) if got == id
        ));
    }

    #[test]
    fn only_unavailable_store_errors_are_retryable() {
        let busy = StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        assert!(CoreError::from(busy).is_retryable());

        for err in [
            StoreError::Migration("x".into()),
            StoreError::NotFound,
            StoreError::Sqlite(rusqlite::Error::InvalidColumnType(
                0,
                "kind".into(),
                rusqlite::types::Type::Text,
            )),
        ] {
            let err = CoreError::from(err);
            assert!(matches!(err, CoreError::Internal(_)));
            assert!(!err.is_retryable());
            assert_eq!(err.code(), "internal");
        }
    }

    #[test]
    fn missing_rows_are_only_users_when_looked_up_as_users() {
        assert!(matches!(
            user_lookup(StoreError::NotFound),
            CoreError::UserNotFound
        ));
        assert!(matches!(
            user_lookup(StoreError::DuplicatePending),
            CoreError::DuplicateRequest
        ));
    }

    #[test]
    fn validation_errors_become_invalid_input() {
        let err = CoreError::from(ValidationError::InvalidEmail);
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.to_string(), "Please enter a valid email address");
    }
}
