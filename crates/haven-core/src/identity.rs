//! Identity provider: registration, password sign-in, email verification
//! and bearer sessions.
//!
//! Every other operation receives the acting user as an explicit
//! [`Actor`], resolved here from a session token.

use std::time::Duration as StdDuration;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use haven_shared::constants::{FALLBACK_DISPLAY_NAME, MAX_FIELD_LEN, MIN_PASSWORD_LEN};
use haven_shared::{email, UserId, ValidationError};
use haven_store::{Collection, EmailVerification, Session, User};
use rand::RngCore;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::{user_lookup, CoreError, Result};
use crate::service::Haven;

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub uid: UserId,
    pub display_name: String,
    pub email: String,
    pub email_verified: bool,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            uid: user.id,
            display_name: display_name_of(user).to_string(),
            email: user.email.clone(),
            email_verified: user.email_verified,
        }
    }
}

pub(crate) fn display_name_of(user: &User) -> &str {
    user.display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_DISPLAY_NAME)
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| CoreError::BackendUnavailable(format!("salt encoding: {e}")))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::BackendUnavailable(format!("password hashing: {e}")))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

/// 32 random bytes, hex encoded.
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Haven {
    /// Create an unverified account and send a verification token.
    pub fn register(&self, email: &str, password: &str, display_name: &str) -> Result<User> {
        if !self.config().registration_open {
            return Err(CoreError::NotAuthorized);
        }
        let email = email::parse(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::Empty { field: "display name" }.into());
        }
        if display_name.chars().count() > MAX_FIELD_LEN {
            return Err(ValidationError::TooLong {
                field: "display name",
                max: MAX_FIELD_LEN,
            }
            .into());
        }

        let password_hash = hash_password(password)?;
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email,
            display_name: Some(display_name.to_string()),
            phone: None,
            address: None,
            photo_url: None,
            email_verified: false,
            created_at: now,
            updated_at: now,
        };

        {
            let db = self.db()?;
            db.insert_user(&user, &password_hash)?;
        }
        info!(user_id = %user.id, "user registered");

        self.issue_verification(&user)?;
        Ok(user)
    }

    /// Password sign-in. Unverified accounts get no session.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = email::normalize(email);
        let credentials = self
            .db()?
            .credentials_by_email(&email)?
            .ok_or(CoreError::InvalidCredentials)?;

        if !verify_password(&credentials.password_hash, password) {
            debug!(user_id = %credentials.user_id, "wrong password");
            return Err(CoreError::InvalidCredentials);
        }
        if !credentials.email_verified {
            return Err(CoreError::EmailNotVerified);
        }

        let now = Utc::now();
        let session = Session {
            token: random_token(),
            user_id: credentials.user_id,
            created_at: now,
            expires_at: now + self.config().session_ttl,
        };
        self.db()?.insert_session(&session)?;
        info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    /// Resolve a bearer token to the acting user.
    pub fn authenticate(&self, token: &str) -> Result<Actor> {
        let db = self.db()?;
        let session = db.get_session(token)?.ok_or(CoreError::Unauthenticated)?;
        if session.expires_at <= Utc::now() {
            db.delete_session(token)?;
            debug!(user_id = %session.user_id, "session expired");
            return Err(CoreError::Unauthenticated);
        }
        match db.get_user(session.user_id) {
            Ok(user) => Ok(Actor::from(&user)),
            Err(haven_store::StoreError::NotFound) => Err(CoreError::Unauthenticated),
            Err(e) => Err(e.into()),
        }
    }

    pub fn sign_out(&self, token: &str) -> Result<()> {
        if self.db()?.delete_session(token)? {
            debug!("session ended");
        }
        Ok(())
    }

    /// Delete sessions past their expiry. Returns how many were removed.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        Ok(self.db()?.purge_expired_sessions(Utc::now())?)
    }

    pub fn resend_verification(&self, actor: &Actor) -> Result<()> {
        let user = self.db()?.get_user(actor.uid).map_err(user_lookup)?;
        if user.email_verified {
            return Err(CoreError::AlreadyVerified);
        }
        self.issue_verification(&user)
    }

    /// Consume a verification token and mark its user verified.
    pub fn verify_email(&self, token: &str) -> Result<User> {
        let mut db = self.db()?;
        let invalid = || CoreError::InvalidInput("Invalid or expired verification link".into());
        let verification = db.take_verification(token.trim())?.ok_or_else(invalid)?;
        let now = Utc::now();
        if verification.expires_at <= now {
            return Err(invalid());
        }
        db.set_email_verified(verification.user_id, now).map_err(user_lookup)?;
        info!(user_id = %verification.user_id, "email verified");
        db.get_user(verification.user_id).map_err(user_lookup)
    }

    pub fn is_email_verified(&self, user: UserId) -> Result<bool> {
        Ok(self.db()?.get_user(user).map_err(user_lookup)?.email_verified)
    }

    /// Wait until `user` is verified or `max_wait` elapses. Returns the final
    /// verification state. Driven by the change feed; dropping the future
    /// cancels the wait.
    pub async fn await_verification(&self, user: UserId, max_wait: StdDuration) -> Result<bool> {
        let mut rx = self.feed().subscribe();
        if self.verified_off_thread(user).await? {
            return Ok(true);
        }

        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Err(_) => return self.verified_off_thread(user).await,
                Ok(Ok(change)) if change.touches(Collection::Users, &user) => {
                    if self.verified_off_thread(user).await? {
                        return Ok(true);
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(RecvError::Lagged(_))) => {
                    if self.verified_off_thread(user).await? {
                        return Ok(true);
                    }
                }
                Ok(Err(RecvError::Closed)) => return self.verified_off_thread(user).await,
            }
        }
    }

    /// `is_email_verified` on the blocking pool, for async callers.
    async fn verified_off_thread(&self, user: UserId) -> Result<bool> {
        let haven = self.clone();
        tokio::task::spawn_blocking(move || haven.is_email_verified(user))
            .await
            .unwrap_or_else(|e| {
                Err(CoreError::Internal(format!("verification check failed: {e}")))
            })
    }

    fn issue_verification(&self, user: &User) -> Result<()> {
        let verification = EmailVerification {
            token: random_token(),
            user_id: user.id,
            expires_at: Utc::now() + self.config().verification_ttl,
        };
        self.db()?.insert_verification(&verification)?;
        if let Err(e) = self
            .mailer()
            .send_verification(&user.email, &verification.token)
        {
            warn!(user_id = %user.id, error = %e, "verification email not sent");
        }
        Ok(())
    }
}
