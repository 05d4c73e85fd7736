//! Sign-in sessions and email verification tokens.

use chrono::{DateTime, Utc};
use haven_shared::UserId;
use rusqlite::{params, OptionalExtension};

use crate::convert::{parse_ts, parse_uuid, ts};
use crate::database::Database;
use crate::error::Result;
use crate::models::{EmailVerification, Session};

impl Database {
    pub fn insert_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token,
                session.user_id.to_string(),
                ts(&session.created_at),
                ts(&session.expires_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let session = self
            .conn()
            .query_row(
                "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?1",
                params![token],
                |row| {
                    let user_id: String = row.get(1)?;
                    let created_at: String = row.get(2)?;
                    let expires_at: String = row.get(3)?;
                    Ok(Session {
                        token: row.get(0)?,
                        user_id: UserId(parse_uuid(1, &user_id)?),
                        created_at: parse_ts(2, &created_at)?,
                        expires_at: parse_ts(3, &expires_at)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(affected > 0)
    }

    /// Remove sessions that expired before `now`. Returns how many were removed.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let affected = self
            .conn()
            .execute("DELETE FROM sessions WHERE expires_at < ?1", params![ts(&now)])?;
        Ok(affected)
    }

    // ------------------------------------------------------------------
    // Email verification
    // ------------------------------------------------------------------

    pub fn insert_verification(&self, verification: &EmailVerification) -> Result<()> {
        self.conn().execute(
            "INSERT INTO email_verifications (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![
                verification.token,
                verification.user_id.to_string(),
                ts(&verification.expires_at),
            ],
        )?;
        Ok(())
    }

    /// Look up and delete a verification token in one step. Tokens are
    /// single use.
    pub fn take_verification(&mut self, token: &str) -> Result<Option<EmailVerification>> {
        let tx = self.conn_mut().transaction()?;
        let found = tx
            .query_row(
                "SELECT token, user_id, expires_at FROM email_verifications WHERE token = ?1",
                params![token],
                |row| {
                    let user_id: String = row.get(1)?;
                    let expires_at: String = row.get(2)?;
                    Ok(EmailVerification {
                        token: row.get(0)?,
                        user_id: UserId(parse_uuid(1, &user_id)?),
                        expires_at: parse_ts(2, &expires_at)?,
                    })
                },
            )
            .optional()?;
        if found.is_some() {
            tx.execute(
                "DELETE FROM email_verifications WHERE token = ?1",
                params![token],
            )?;
        }
        tx.commit()?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::users::tests::sample_user;

    #[test]
    fn session_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user("a@example.com", "A");
        db.insert_user(&user, "h").unwrap();

        let now = Utc::now();
        let session = Session {
            token: "tok".into(),
            user_id: user.id,
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        db.insert_session(&session).unwrap();
        assert_eq!(db.get_session("tok").unwrap().unwrap().user_id, user.id);

        assert!(db.delete_session("tok").unwrap());
        assert!(db.get_session("tok").unwrap().is_none());
        assert!(!db.delete_session("tok").unwrap());
    }

    #[test]
    fn purge_removes_only_expired() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user("a@example.com", "A");
        db.insert_user(&user, "h").unwrap();
        let now = Utc::now();

        for (token, offset) in [("old", -2), ("fresh", 2)] {
            db.insert_session(&Session {
                token: token.into(),
                user_id: user.id,
                created_at: now,
                expires_at: now + Duration::hours(offset),
            })
            .unwrap();
        }

        assert_eq!(db.purge_expired_sessions(now).unwrap(), 1);
        assert!(db.get_session("fresh").unwrap().is_some());
    }

    #[test]
    fn verification_tokens_are_single_use() {
        let mut db = Database::open_in_memory().unwrap();
        let user = sample_user("a@example.com", "A");
        db.insert_user(&user, "h").unwrap();
        db.insert_verification(&EmailVerification {
            token: "v1".into(),
            user_id: user.id,
            expires_at: Utc::now() + Duration::hours(1),
        })
        .unwrap();

        assert!(db.take_verification("v1").unwrap().is_some());
        assert!(db.take_verification("v1").unwrap().is_none());
    }
}
