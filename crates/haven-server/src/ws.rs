//! WebSocket live feeds: `/ws/{feed}`.
//!
//! Each connection authenticates with a bearer header or a `token` query
//! parameter, then receives the initial snapshot and every later snapshot
//! as a JSON text frame until either side closes. Creating a subscription
//! only attaches to the change feed; snapshot queries run on the blocking
//! pool inside `Subscription::next`.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use haven_core::{CoreError, Filter, Subscription};
use haven_shared::constants::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::auth::{bearer_token, Authenticated};
use crate::error::ServerError;

#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub async fn ws_feed(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(feed): Path<String>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let token = bearer_token(&headers)
        .or(query.token)
        .ok_or(CoreError::Unauthenticated)?;
    let auth = Authenticated::from_token(&state, token).await?;
    let haven = &state.haven;

    let upgrade = match feed.as_str() {
        "requests" => {
            let sub = haven.watch_pending_incoming(&auth.actor, None);
            ws.on_upgrade(move |socket| forward(socket, sub))
        }
        "check-ins" => {
            let sub = haven.watch_history(&auth.actor, DEFAULT_HISTORY_LIMIT);
            ws.on_upgrade(move |socket| forward(socket, sub))
        }
        "notifications" => {
            let sub = haven.watch_notifications(&auth.actor, Filter::All);
            ws.on_upgrade(move |socket| forward(socket, sub))
        }
        other => {
            return Err(ServerError::BadRequest(format!("Unknown feed: {other}")));
        }
    };
    debug!(feed = %feed, user_id = %auth.actor.uid, "live feed opened");
    Ok(upgrade.into_response())
}

async fn forward<T: Serialize + Send + 'static>(socket: WebSocket, mut sub: Subscription<T>) {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            snapshot = sub.next() => {
                let Some(snapshot) = snapshot else { break };
                let json = match snapshot {
                    Ok(items) => serde_json::to_string(&items),
                    Err(e) => {
                        warn!(error = %e, "live query failed");
                        serde_json::to_string(&serde_json::json!({
                            "error": e.to_string(),
                            "code": e.code(),
                            "retryable": e.is_retryable(),
                        }))
                    }
                };
                match json {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket send failed, client disconnected");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to serialize snapshot"),
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    sub.cancel();
    debug!("live feed closed");
}
