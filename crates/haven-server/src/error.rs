use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use haven_core::CoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Photo not found: {0}")]
    BlobNotFound(Uuid),

    #[error("Photo too large: {size} bytes (max {max})")]
    BlobTooLarge { size: usize, max: usize },

    #[error("Only JPEG and PNG images are supported")]
    UnsupportedMedia,

    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Core(e) => match e {
                CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CoreError::SelfReference => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::TargetNotFound(_)
                | CoreError::RequestNotFound(_)
                | CoreError::NotificationNotFound(_)
                | CoreError::UserNotFound => StatusCode::NOT_FOUND,
                CoreError::AlreadyConnected
                | CoreError::DuplicateRequest
                | CoreError::RequestAlreadyResolved(_)
                | CoreError::EmailAlreadyRegistered
                | CoreError::AlreadyVerified => StatusCode::CONFLICT,
                CoreError::NotAuthorized | CoreError::EmailNotVerified => StatusCode::FORBIDDEN,
                CoreError::InvalidCredentials | CoreError::Unauthenticated => {
                    StatusCode::UNAUTHORIZED
                }
                CoreError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::BlobNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BlobTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::UnsupportedMedia => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::BlobStorage(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ServerError::Core(e) => e.code(),
            ServerError::BlobNotFound(_) => "blob_not_found",
            ServerError::BlobTooLarge { .. } => "blob_too_large",
            ServerError::UnsupportedMedia => "unsupported_media",
            ServerError::BlobStorage(_) => "blob_storage",
            ServerError::BadRequest(_) => "bad_request",
            ServerError::Internal(_) => "internal",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            ServerError::Core(e) => e.is_retryable(),
            ServerError::BlobStorage(_) => true,
            _ => false,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::BlobStorage(_) => "Blob storage error".to_string(),
            ServerError::Internal(_) | ServerError::Core(CoreError::Internal(_)) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": message,
            "code": self.code(),
            "retryable": self.retryable(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use haven_shared::RequestId;

    use super::*;

    #[test]
    fn core_errors_map_to_distinct_statuses() {
        let cases = [
            (CoreError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::SelfReference, StatusCode::UNPROCESSABLE_ENTITY),
            (CoreError::TargetNotFound("a@b.c".into()), StatusCode::NOT_FOUND),
            (CoreError::DuplicateRequest, StatusCode::CONFLICT),
            (
                CoreError::RequestAlreadyResolved(RequestId::new()),
                StatusCode::CONFLICT,
            ),
            (CoreError::NotAuthorized, StatusCode::FORBIDDEN),
            (CoreError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                CoreError::BackendUnavailable("busy".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CoreError::Internal("bad row".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(ServerError::from(CoreError::BackendUnavailable("x".into())).retryable());
        assert!(!ServerError::from(CoreError::AlreadyConnected).retryable());
        assert!(!ServerError::from(CoreError::Internal("bad row".into())).retryable());
        assert!(!ServerError::UnsupportedMedia.retryable());
    }
}
