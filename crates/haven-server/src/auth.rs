//! Bearer-session authentication for handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use haven_core::{Actor, CoreError};

use crate::api::{blocking, AppState};
use crate::error::ServerError;

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// The signed-in caller, resolved from the session token.
pub struct Authenticated {
    pub actor: Actor,
    pub token: String,
}

impl Authenticated {
    pub async fn from_token(state: &AppState, token: String) -> Result<Self, ServerError> {
        let lookup = token.clone();
        let actor = blocking(&state.haven, move |h| h.authenticate(&lookup)).await?;
        Ok(Self { actor, token })
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(CoreError::Unauthenticated)?;
        Self::from_token(state, token).await
    }
}
