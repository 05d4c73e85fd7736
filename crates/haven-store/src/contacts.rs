//! Queries and writes for [`ContactEdge`] records.
//!
//! Edges are only ever created through a [`WriteBatch`](crate::WriteBatch)
//! that also resolves the originating request.

use haven_shared::{RelationshipKind, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::convert::{parse_enum, parse_ts, parse_uuid, ts};
use crate::database::Database;
use crate::error::{is_constraint_violation, Result, StoreError};
use crate::models::ContactEdge;

const EDGE_COLUMNS: &str = "owner_id, target_id, kind, target_name, target_email,
     relationship, nickname, phone, can_track, added_at";

impl Database {
    pub fn get_edge(
        &self,
        owner: UserId,
        target: UserId,
        kind: RelationshipKind,
    ) -> Result<Option<ContactEdge>> {
        let edge = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {EDGE_COLUMNS} FROM contact_edges
                     WHERE owner_id = ?1 AND target_id = ?2 AND kind = ?3"
                ),
                params![owner.to_string(), target.to_string(), kind.as_str()],
                row_to_edge,
            )
            .optional()?;
        Ok(edge)
    }

    /// Whether either user already has the other as a contact of `kind`.
    pub fn connected(&self, a: UserId, b: UserId, kind: RelationshipKind) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM contact_edges
             WHERE kind = ?3
               AND ((owner_id = ?1 AND target_id = ?2) OR (owner_id = ?2 AND target_id = ?1))",
            params![a.to_string(), b.to_string(), kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// The owner's contact list, ordered by name.
    pub fn list_contacts(
        &self,
        owner: UserId,
        kind: Option<RelationshipKind>,
    ) -> Result<Vec<ContactEdge>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM contact_edges
             WHERE owner_id = ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY target_name COLLATE NOCASE ASC, kind ASC"
        ))?;

        let rows = stmt.query_map(
            params![owner.to_string(), kind.map(|k| k.as_str())],
            row_to_edge,
        )?;

        let mut edges = Vec::new();
        for row in rows {
            edges.push(row?);
        }
        Ok(edges)
    }

    /// Distinct users in the owner's contact list across both kinds.
    pub fn contact_ids(&self, owner: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT target_id FROM contact_edges WHERE owner_id = ?1 ORDER BY target_id",
        )?;
        let rows = stmt.query_map(params![owner.to_string()], |row| {
            let id: String = row.get(0)?;
            Ok(UserId(parse_uuid(0, &id)?))
        })?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}

pub(crate) fn insert_edge(conn: &Connection, edge: &ContactEdge) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO contact_edges ({EDGE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            edge.owner_id.to_string(),
            edge.target_id.to_string(),
            edge.kind.as_str(),
            edge.target_name,
            edge.target_email,
            edge.relationship.map(|r| r.label()),
            edge.nickname,
            edge.phone,
            edge.can_track,
            ts(&edge.added_at),
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            StoreError::EdgeExists
        } else {
            StoreError::Sqlite(e)
        }
    })?;
    Ok(())
}

fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContactEdge> {
    let owner_id: String = row.get(0)?;
    let target_id: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let relationship: Option<String> = row.get(5)?;
    let added_at: String = row.get(9)?;

    Ok(ContactEdge {
        owner_id: UserId(parse_uuid(0, &owner_id)?),
        target_id: UserId(parse_uuid(1, &target_id)?),
        kind: parse_enum(2, &kind)?,
        target_name: row.get(3)?,
        target_email: row.get(4)?,
        relationship: relationship.map(|r| parse_enum(5, &r)).transpose()?,
        nickname: row.get(6)?,
        phone: row.get(7)?,
        can_track: row.get(8)?,
        added_at: parse_ts(9, &added_at)?,
    })
}
