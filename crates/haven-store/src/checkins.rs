//! Check-in history storage.

use haven_shared::{CheckInId, UserId};
use rusqlite::{params, Connection};

use crate::convert::{parse_enum, parse_ts, parse_uuid, ts};
use crate::database::Database;
use crate::error::{not_found, Result};
use crate::models::CheckIn;

const CHECK_IN_COLUMNS: &str = "id, user_id, user_name, status, location, created_at";

impl Database {
    pub fn get_check_in(&self, id: CheckInId) -> Result<CheckIn> {
        self.conn()
            .query_row(
                &format!("SELECT {CHECK_IN_COLUMNS} FROM check_ins WHERE id = ?1"),
                params![id.to_string()],
                row_to_check_in,
            )
            .map_err(not_found)
    }

    /// The user's most recent check-ins, newest first.
    pub fn check_ins_for(&self, user: UserId, limit: u32) -> Result<Vec<CheckIn>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CHECK_IN_COLUMNS} FROM check_ins
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![user.to_string(), limit], row_to_check_in)?;

        let mut check_ins = Vec::new();
        for row in rows {
            check_ins.push(row?);
        }
        Ok(check_ins)
    }
}

pub(crate) fn insert_check_in(conn: &Connection, check_in: &CheckIn) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO check_ins ({CHECK_IN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            check_in.id.to_string(),
            check_in.user_id.to_string(),
            check_in.user_name,
            check_in.status.as_str(),
            check_in.location,
            ts(&check_in.created_at),
        ],
    )?;
    Ok(())
}

fn row_to_check_in(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckIn> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(5)?;

    Ok(CheckIn {
        id: CheckInId(parse_uuid(0, &id)?),
        user_id: UserId(parse_uuid(1, &user_id)?),
        user_name: row.get(2)?,
        status: parse_enum(3, &status)?,
        location: row.get(4)?,
        created_at: parse_ts(5, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use haven_shared::CheckInStatus;

    use super::*;

    #[test]
    fn history_is_newest_first_and_limited() {
        let db = Database::open_in_memory().unwrap();
        let user = UserId::new();
        let base = Utc::now();
        for (i, status) in [CheckInStatus::Safe, CheckInStatus::Warning, CheckInStatus::Danger]
            .into_iter()
            .enumerate()
        {
            insert_check_in(
                db.conn(),
                &CheckIn {
                    id: CheckInId::new(),
                    user_id: user,
                    user_name: "Ana".into(),
                    status,
                    location: "Home".into(),
                    created_at: base + Duration::minutes(i as i64),
                },
            )
            .unwrap();
        }

        let history = db.check_ins_for(user, 2).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, CheckInStatus::Danger);
        assert_eq!(history[1].status, CheckInStatus::Warning);
        assert!(db.check_ins_for(UserId::new(), 10).unwrap().is_empty());
    }
}
