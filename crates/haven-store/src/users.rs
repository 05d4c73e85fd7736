//! CRUD operations for [`User`] records and their credentials.

use chrono::{DateTime, Utc};
use haven_shared::UserId;
use rusqlite::{params, OptionalExtension};

use crate::convert::{parse_ts, parse_uuid, ts};
use crate::database::Database;
use crate::error::{is_constraint_violation, not_found, Result, StoreError};
use crate::feed::{Change, Collection};
use crate::models::{Credentials, ProfilePatch, User};

const USER_COLUMNS: &str =
    "id, email, display_name, phone, address, photo_url, email_verified, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user. The email must already be normalised.
    pub fn insert_user(&self, user: &User, password_hash: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, email, password_hash, display_name, phone, address,
                                    photo_url, email_verified, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    user.id.to_string(),
                    user.email,
                    password_hash,
                    user.display_name,
                    user.phone,
                    user.address,
                    user.photo_url,
                    user.email_verified,
                    ts(&user.created_at),
                    ts(&user.updated_at),
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    StoreError::EmailTaken
                } else {
                    StoreError::Sqlite(e)
                }
            })?;

        self.feed()
            .publish(Change::new(Collection::Users, user.id, vec![user.id]));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Equality lookup on the normalised email.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn credentials_by_email(&self, email: &str) -> Result<Option<Credentials>> {
        let creds = self
            .conn()
            .query_row(
                "SELECT id, password_hash, email_verified FROM users WHERE email = ?1",
                params![email],
                |row| {
                    let id: String = row.get(0)?;
                    Ok(Credentials {
                        user_id: UserId(parse_uuid(0, &id)?),
                        password_hash: row.get(1)?,
                        email_verified: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(creds)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a profile patch and return the updated user.
    pub fn update_profile(&self, id: UserId, patch: &ProfilePatch, now: DateTime<Utc>) -> Result<User> {
        let affected = self.conn().execute(
            "UPDATE users SET
                display_name = COALESCE(?2, display_name),
                phone        = COALESCE(?3, phone),
                address      = COALESCE(?4, address),
                photo_url    = COALESCE(?5, photo_url),
                updated_at   = ?6
             WHERE id = ?1",
            params![
                id.to_string(),
                patch.display_name,
                patch.phone,
                patch.address,
                patch.photo_url,
                ts(&now),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.feed().publish(Change::new(Collection::Users, id, vec![id]));
        self.get_user(id)
    }

    pub fn set_email_verified(&self, id: UserId, now: DateTime<Utc>) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET email_verified = 1, updated_at = ?2 WHERE id = ?1",
            params![id.to_string(), ts(&now)],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.feed().publish(Change::new(Collection::Users, id, vec![id]));
        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(User {
        id: UserId(parse_uuid(0, &id)?),
        email: row.get(1)?,
        display_name: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        photo_url: row.get(5)?,
        email_verified: row.get(6)?,
        created_at: parse_ts(7, &created_at)?,
        updated_at: parse_ts(8, &updated_at)?,
    })
}
