//! Queries and writes for [`RelationshipRequest`] records.
//!
//! Writes are exposed as `pub(crate)` functions over a plain connection so
//! that [`WriteBatch`](crate::WriteBatch) can run them inside its
//! transaction.

use chrono::{DateTime, Utc};
use haven_shared::{RelationshipKind, RequestId, RequestStatus, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::convert::{parse_enum, parse_opt_ts, parse_ts, parse_uuid, ts};
use crate::database::Database;
use crate::error::{is_constraint_violation, not_found, Result, StoreError};
use crate::models::RelationshipRequest;

const REQUEST_COLUMNS: &str = "id, kind, from_user_id, from_user_name, from_user_email,
     to_user_id, to_user_name, to_user_email, relationship, nickname, phone,
     status, created_at, resolved_at";

impl Database {
    pub fn get_request(&self, id: RequestId) -> Result<RelationshipRequest> {
        self.conn()
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM relationship_requests WHERE id = ?1"),
                params![id.to_string()],
                row_to_request,
            )
            .map_err(not_found)
    }

    /// The pending request from `from` to `to` of `kind`, if any.
    pub fn pending_request_between(
        &self,
        from: UserId,
        to: UserId,
        kind: RelationshipKind,
    ) -> Result<Option<RelationshipRequest>> {
        let request = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {REQUEST_COLUMNS} FROM relationship_requests
                     WHERE from_user_id = ?1 AND to_user_id = ?2 AND kind = ?3
                       AND status = 'pending'"
                ),
                params![from.to_string(), to.to_string(), kind.as_str()],
                row_to_request,
            )
            .optional()?;
        Ok(request)
    }

    /// Pending requests addressed to `to`, newest first.
    pub fn pending_requests_to(
        &self,
        to: UserId,
        kind: Option<RelationshipKind>,
    ) -> Result<Vec<RelationshipRequest>> {
        self.query_pending("to_user_id", to, kind)
    }

    /// Pending requests sent by `from`, newest first.
    pub fn pending_requests_from(
        &self,
        from: UserId,
        kind: Option<RelationshipKind>,
    ) -> Result<Vec<RelationshipRequest>> {
        self.query_pending("from_user_id", from, kind)
    }

    fn query_pending(
        &self,
        column: &str,
        user: UserId,
        kind: Option<RelationshipKind>,
    ) -> Result<Vec<RelationshipRequest>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REQUEST_COLUMNS} FROM relationship_requests
             WHERE {column} = ?1 AND status = 'pending'
               AND (?2 IS NULL OR kind = ?2)
             ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map(
            params![user.to_string(), kind.map(|k| k.as_str())],
            row_to_request,
        )?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }
}

pub(crate) fn insert_request(conn: &Connection, request: &RelationshipRequest) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO relationship_requests ({REQUEST_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        params![
            request.id.to_string(),
            request.kind.as_str(),
            request.from_user_id.to_string(),
            request.from_user_name,
            request.from_user_email,
            request.to_user_id.to_string(),
            request.to_user_name,
            request.to_user_email,
            request.relationship.map(|r| r.label()),
            request.nickname,
            request.phone,
            request.status.as_str(),
            ts(&request.created_at),
            request.resolved_at.as_ref().map(ts),
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            StoreError::DuplicatePending
        } else {
            StoreError::Sqlite(e)
        }
    })?;
    Ok(())
}

/// Move a pending request to `status`. Fails with
/// [`StoreError::RequestNotPending`] when the request was resolved by
/// someone else first.
pub(crate) fn resolve_request(
    conn: &Connection,
    id: RequestId,
    status: RequestStatus,
    at: DateTime<Utc>,
) -> Result<()> {
    let affected = conn.execute(
        "UPDATE relationship_requests SET status = ?2, resolved_at = ?3
         WHERE id = ?1 AND status = 'pending'",
        params![id.to_string(), status.as_str(), ts(&at)],
    )?;
    if affected == 1 {
        Ok(())
    } else {
        Err(StoreError::RequestNotPending(id))
    }
}

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<RelationshipRequest> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let from_user_id: String = row.get(2)?;
    let to_user_id: String = row.get(5)?;
    let relationship: Option<String> = row.get(8)?;
    let status: String = row.get(11)?;
    let created_at: String = row.get(12)?;
    let resolved_at: Option<String> = row.get(13)?;

    Ok(RelationshipRequest {
        id: RequestId(parse_uuid(0, &id)?),
        kind: parse_enum(1, &kind)?,
        from_user_id: UserId(parse_uuid(2, &from_user_id)?),
        from_user_name: row.get(3)?,
        from_user_email: row.get(4)?,
        to_user_id: UserId(parse_uuid(5, &to_user_id)?),
        to_user_name: row.get(6)?,
        to_user_email: row.get(7)?,
        relationship: relationship.map(|r| parse_enum(8, &r)).transpose()?,
        nickname: row.get(9)?,
        phone: row.get(10)?,
        status: parse_enum(11, &status)?,
        created_at: parse_ts(12, &created_at)?,
        resolved_at: parse_opt_ts(13, resolved_at)?,
    })
}
