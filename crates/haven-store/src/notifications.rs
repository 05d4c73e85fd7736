//! Notification inbox storage.

use haven_shared::{NotificationId, UserId};
use rusqlite::{params, Connection};

use crate::convert::{parse_enum, parse_ts, parse_uuid, ts};
use crate::database::Database;
use crate::error::{not_found, Result};
use crate::feed::{Change, Collection};
use crate::models::{Notification, NotificationPayload};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, title, message, from_user_id, from_user_name, read, payload, created_at";

impl Database {
    pub fn get_notification(&self, id: NotificationId) -> Result<Notification> {
        self.conn()
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                params![id.to_string()],
                row_to_notification,
            )
            .map_err(not_found)
    }

    /// Notifications addressed to `user`, newest first.
    pub fn notifications_for(&self, user: UserId, unread_only: bool) -> Result<Vec<Notification>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = ?1 AND (?2 = 0 OR read = 0)
             ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map(params![user.to_string(), unread_only], row_to_notification)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }

    pub fn unread_count(&self, user: UserId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
            params![user.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Flip `read` on one notification. Returns `false` if it was already read.
    pub fn mark_notification_read(&self, id: NotificationId, user: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2 AND read = 0",
            params![id.to_string(), user.to_string()],
        )?;
        if affected > 0 {
            self.feed()
                .publish(Change::new(Collection::Notifications, id, vec![user]));
        }
        Ok(affected > 0)
    }

    pub fn mark_all_notifications_read(&self, user: UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
            params![user.to_string()],
        )?;
        if affected > 0 {
            self.feed()
                .publish(Change::new(Collection::Notifications, "*", vec![user]));
        }
        Ok(affected)
    }

    /// Bulk delete every notification addressed to `user`.
    pub fn delete_notifications_for(&self, user: UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM notifications WHERE user_id = ?1",
            params![user.to_string()],
        )?;
        if affected > 0 {
            self.feed()
                .publish(Change::new(Collection::Notifications, "*", vec![user]));
        }
        Ok(affected)
    }
}

pub(crate) fn insert_notification(conn: &Connection, notification: &Notification) -> Result<()> {
    let payload = serde_json::to_string(&notification.payload)?;
    conn.execute(
        &format!(
            "INSERT INTO notifications ({NOTIFICATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            notification.id.to_string(),
            notification.user_id.to_string(),
            notification.kind.as_str(),
            notification.title,
            notification.message,
            notification.from_user_id.map(|id| id.to_string()),
            notification.from_user_name,
            notification.read,
            payload,
            ts(&notification.created_at),
        ],
    )?;
    Ok(())
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let from_user_id: Option<String> = row.get(5)?;
    let payload: String = row.get(8)?;
    let created_at: String = row.get(9)?;

    let payload: NotificationPayload = serde_json::from_str(&payload).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Notification {
        id: NotificationId(parse_uuid(0, &id)?),
        user_id: UserId(parse_uuid(1, &user_id)?),
        kind: parse_enum(2, &kind)?,
        title: row.get(3)?,
        message: row.get(4)?,
        from_user_id: from_user_id
            .map(|s| parse_uuid(5, &s).map(UserId))
            .transpose()?,
        from_user_name: row.get(6)?,
        read: row.get(7)?,
        created_at: parse_ts(9, &created_at)?,
        payload,
    })
}
