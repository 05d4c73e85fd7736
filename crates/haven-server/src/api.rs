use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use haven_core::{Filter, Haven, NewRequest, ProfileUpdate};
use haven_shared::constants::DEFAULT_HISTORY_LIMIT;
use haven_shared::hotlines::{self, Hotline, HotlineCategory};
use haven_shared::{CheckInStatus, NotificationId, RelationshipKind, RequestId, UserId};
use haven_store::{CheckIn, ContactEdge, Notification, RelationshipRequest, User};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Authenticated;
use crate::blob_store::BlobStore;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::ws::ws_feed;

#[derive(Clone)]
pub struct AppState {
    pub haven: Haven,
    pub blob_store: Arc<BlobStore>,
    pub config: Arc<ServerConfig>,
}

/// Run a synchronous core operation off the async runtime.
pub async fn blocking<T, F>(haven: &Haven, op: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&Haven) -> haven_core::Result<T> + Send + 'static,
{
    let haven = haven.clone();
    tokio::task::spawn_blocking(move || op(&haven))
        .await
        .map_err(|e| ServerError::Internal(format!("Task failed: {e}")))?
        .map_err(ServerError::from)
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);
    // Multipart framing on top of the photo itself.
    let body_limit = state.config.max_blob_size + 64 * 1024;

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/hotlines", get(list_hotlines))
        .route("/auth/register", post(register))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/verify", post(verify_email))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/profile", get(get_own_profile).put(update_profile))
        .route("/profile/photo", post(upload_photo))
        .route("/users/{id}", get(get_user_profile))
        .route("/blob/{uid}/{id}", get(download_photo))
        .route("/requests", post(submit_request))
        .route("/requests/incoming", get(incoming_requests))
        .route("/requests/outgoing", get(outgoing_requests))
        .route("/requests/{id}/accept", post(accept_request))
        .route("/requests/{id}/reject", post(reject_request))
        .route("/contacts", get(list_contacts))
        .route("/check-ins", get(check_in_history).post(check_in))
        .route("/notifications", get(list_notifications).delete(clear_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/{id}/read", post(mark_read))
        .route("/ws/{feed}", get(ws_feed))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request / response bodies ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    registration_open: bool,
    max_photo_size: usize,
}

#[derive(Deserialize)]
struct HotlineQuery {
    category: Option<String>,
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    display_name: String,
}

#[derive(Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    token: String,
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct VerifyRequest {
    token: String,
}

#[derive(Deserialize)]
struct KindQuery {
    kind: Option<RelationshipKind>,
}

#[derive(Deserialize)]
struct CheckInRequest {
    status: CheckInStatus,
    #[serde(default)]
    location: String,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct NotificationQuery {
    #[serde(default)]
    unread: bool,
}

#[derive(Serialize)]
struct CountResponse {
    count: u64,
}

// ─── Instance ───

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        registration_open: state.config.registration_open,
        max_photo_size: state.config.max_blob_size,
    })
}

async fn list_hotlines(
    Query(query): Query<HotlineQuery>,
) -> Result<Json<Vec<&'static Hotline>>, ServerError> {
    let category = query
        .category
        .map(|c| c.parse::<HotlineCategory>())
        .transpose()
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    Ok(Json(hotlines::by_category(category)))
}

// ─── Identity ───

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<User>, ServerError> {
    let user = blocking(&state.haven, move |h| {
        h.register(&req.email, &req.password, &req.display_name)
    })
    .await?;
    Ok(Json(user))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    let session = blocking(&state.haven, move |h| h.sign_in(&req.email, &req.password)).await?;
    Ok(Json(SessionResponse {
        token: session.token,
        user_id: session.user_id,
        expires_at: session.expires_at,
    }))
}

async fn sign_out(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<serde_json::Value>, ServerError> {
    let token = auth.token;
    blocking(&state.haven, move |h| h.sign_out(&token)).await?;
    Ok(Json(serde_json::json!({ "signed_out": true })))
}

async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<User>, ServerError> {
    let user = blocking(&state.haven, move |h| h.verify_email(&req.token)).await?;
    Ok(Json(user))
}

async fn resend_verification(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<serde_json::Value>, ServerError> {
    let actor = auth.actor;
    blocking(&state.haven, move |h| h.resend_verification(&actor)).await?;
    Ok(Json(serde_json::json!({ "sent": true })))
}

// ─── Profile ───

async fn get_own_profile(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<User>, ServerError> {
    let uid = auth.actor.uid;
    Ok(Json(blocking(&state.haven, move |h| h.get_profile(uid)).await?))
}

async fn get_user_profile(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<UserId>,
) -> Result<Json<User>, ServerError> {
    Ok(Json(blocking(&state.haven, move |h| h.get_profile(id)).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, ServerError> {
    let actor = auth.actor;
    let user = blocking(&state.haven, move |h| h.update_profile(&actor, update)).await?;
    Ok(Json(user))
}

async fn upload_photo(
    State(state): State<AppState>,
    auth: Authenticated,
    mut multipart: Multipart,
) -> Result<Json<User>, ServerError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {}", e)))?;
            upload = Some(data);
            break;
        }
    }
    let data = upload.ok_or_else(|| {
        ServerError::BadRequest("Missing 'file' field in multipart form".to_string())
    })?;

    let uid = auth.actor.uid;
    let previous = blocking(&state.haven, move |h| h.get_profile(uid))
        .await?
        .photo_url;

    let id = state.blob_store.store_photo(uid, &data).await?;
    let update = ProfileUpdate {
        photo_url: Some(state.blob_store.url_for(uid, id)),
        ..Default::default()
    };
    let actor = auth.actor;
    let user = blocking(&state.haven, move |h| h.update_profile(&actor, update)).await?;
    info!(user_id = %uid, id = %id, size = data.len(), "Profile photo uploaded");

    if let Some((owner, old)) = previous.and_then(|url| state.blob_store.parse_url(&url)) {
        if owner == uid && old != id {
            if let Err(e) = state.blob_store.delete_photo(owner, old).await {
                warn!(error = %e, "Failed to remove previous photo");
            }
        }
    }
    Ok(Json(user))
}

async fn download_photo(
    State(state): State<AppState>,
    Path((uid, id)): Path<(UserId, Uuid)>,
) -> Result<impl IntoResponse, ServerError> {
    let (data, content_type) = state.blob_store.get_photo(uid, id).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

// ─── Relationships ───

async fn submit_request(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(new): Json<NewRequest>,
) -> Result<Json<RelationshipRequest>, ServerError> {
    let actor = auth.actor;
    let request = blocking(&state.haven, move |h| h.submit_request(&actor, new)).await?;
    Ok(Json(request))
}

async fn incoming_requests(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<KindQuery>,
) -> Result<Json<Vec<RelationshipRequest>>, ServerError> {
    let actor = auth.actor;
    let requests = blocking(&state.haven, move |h| h.pending_incoming(&actor, query.kind)).await?;
    Ok(Json(requests))
}

async fn outgoing_requests(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<KindQuery>,
) -> Result<Json<Vec<RelationshipRequest>>, ServerError> {
    let actor = auth.actor;
    let requests = blocking(&state.haven, move |h| h.pending_outgoing(&actor, query.kind)).await?;
    Ok(Json(requests))
}

async fn accept_request(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<RequestId>,
) -> Result<Json<RelationshipRequest>, ServerError> {
    let actor = auth.actor;
    Ok(Json(blocking(&state.haven, move |h| h.accept(&actor, id)).await?))
}

async fn reject_request(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<RequestId>,
) -> Result<Json<RelationshipRequest>, ServerError> {
    let actor = auth.actor;
    Ok(Json(blocking(&state.haven, move |h| h.reject(&actor, id)).await?))
}

async fn list_contacts(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<KindQuery>,
) -> Result<Json<Vec<ContactEdge>>, ServerError> {
    let actor = auth.actor;
    Ok(Json(
        blocking(&state.haven, move |h| h.contacts(&actor, query.kind)).await?,
    ))
}

// ─── Check-ins ───

async fn check_in(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(req): Json<CheckInRequest>,
) -> Result<Json<CheckIn>, ServerError> {
    let actor = auth.actor;
    let check_in =
        blocking(&state.haven, move |h| h.check_in(&actor, req.status, &req.location)).await?;
    Ok(Json(check_in))
}

async fn check_in_history(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CheckIn>>, ServerError> {
    let actor = auth.actor;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(
        blocking(&state.haven, move |h| h.history(&actor, limit)).await?,
    ))
}

// ─── Notifications ───

async fn list_notifications(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, ServerError> {
    let actor = auth.actor;
    let filter = if query.unread { Filter::Unread } else { Filter::All };
    Ok(Json(
        blocking(&state.haven, move |h| h.notifications(&actor, filter)).await?,
    ))
}

async fn unread_count(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<CountResponse>, ServerError> {
    let actor = auth.actor;
    let count = blocking(&state.haven, move |h| h.unread_count(&actor)).await?;
    Ok(Json(CountResponse { count }))
}

async fn mark_read(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<NotificationId>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let actor = auth.actor;
    blocking(&state.haven, move |h| h.mark_read(&actor, id)).await?;
    Ok(Json(serde_json::json!({ "read": true })))
}

async fn mark_all_read(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<CountResponse>, ServerError> {
    let actor = auth.actor;
    let changed = blocking(&state.haven, move |h| h.mark_all_read(&actor)).await?;
    Ok(Json(CountResponse {
        count: changed as u64,
    }))
}

async fn clear_notifications(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<CountResponse>, ServerError> {
    let actor = auth.actor;
    let removed = blocking(&state.haven, move |h| h.clear_all(&actor)).await?;
    Ok(Json(CountResponse {
        count: removed as u64,
    }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
