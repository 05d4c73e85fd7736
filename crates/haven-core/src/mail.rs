use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Outbound email used for verification links.
pub trait Mailer: Send + Sync {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), MailError>;
}

/// Logs the verification token instead of sending mail. Development only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMailer;

impl Mailer for TracingMailer {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), MailError> {
        info!(%email, %token, "verification email");
        Ok(())
    }
}

/// Remembers the last token sent to each address.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_token_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().ok()?;
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Mailer for RecordingMailer {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .map_err(|e| MailError(e.to_string()))?
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}
