//! Push delivery boundary.
//!
//! Stored notifications are the source of truth; push is a best-effort
//! nudge that routes a tap to a named screen. Delivery failures are logged
//! by the caller and never fail the operation that produced them.

use std::sync::Mutex;

use haven_shared::{PushRoute, UserId};
use haven_store::Notification;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub route: PushRoute,
}

impl From<&Notification> for PushMessage {
    fn from(n: &Notification) -> Self {
        Self {
            user_id: n.user_id,
            title: n.title.clone(),
            body: n.message.clone(),
            route: n.kind.route(),
        }
    }
}

#[derive(Error, Debug)]
#[error("push delivery failed: {0}")]
pub struct PushError(pub String);

pub trait PushGateway: Send + Sync {
    fn deliver(&self, message: &PushMessage) -> Result<(), PushError>;
}

/// Logs each message instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPushGateway;

impl PushGateway for TracingPushGateway {
    fn deliver(&self, message: &PushMessage) -> Result<(), PushError> {
        info!(
            user_id = %message.user_id,
            route = message.route.as_str(),
            title = %message.title,
            "push"
        );
        Ok(())
    }
}

/// Keeps every delivered message in memory.
#[derive(Debug, Default)]
pub struct RecordingPushGateway {
    sent: Mutex<Vec<PushMessage>>,
}

impl RecordingPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl PushGateway for RecordingPushGateway {
    fn deliver(&self, message: &PushMessage) -> Result<(), PushError> {
        self.sent
            .lock()
            .map_err(|e| PushError(e.to_string()))?
            .push(message.clone());
        Ok(())
    }
}
