//! Atomic multi-document writes.
//!
//! A [`WriteBatch`] is an ordered list of [`WriteOp`]s applied inside one
//! SQLite transaction: either every op lands or none does. Changes are
//! published on the feed only after the transaction commits.

use chrono::{DateTime, Utc};
use haven_shared::{RequestId, RequestStatus, UserId};
use tracing::debug;

use crate::checkins::insert_check_in;
use crate::contacts::insert_edge;
use crate::database::Database;
use crate::error::Result;
use crate::feed::{Change, Collection};
use crate::models::{CheckIn, ContactEdge, Notification, RelationshipRequest};
use crate::notifications::insert_notification;
use crate::requests::{insert_request, resolve_request};

#[derive(Debug, Clone)]
pub enum WriteOp {
    InsertRequest(RelationshipRequest),
    /// Conditional update: only succeeds while the request is still pending.
    ResolveRequest {
        id: RequestId,
        from: UserId,
        to: UserId,
        status: RequestStatus,
        at: DateTime<Utc>,
    },
    InsertEdge(ContactEdge),
    InsertNotification(Notification),
    InsertCheckIn(CheckIn),
}

impl WriteOp {
    fn change(&self) -> Change {
        match self {
            WriteOp::InsertRequest(r) => Change::new(
                Collection::Requests,
                r.id,
                vec![r.from_user_id, r.to_user_id],
            ),
            WriteOp::ResolveRequest { id, from, to, .. } => {
                Change::new(Collection::Requests, id, vec![*from, *to])
            }
            WriteOp::InsertEdge(e) => Change::new(
                Collection::Contacts,
                format!("{}:{}:{}", e.owner_id, e.target_id, e.kind),
                vec![e.owner_id],
            ),
            WriteOp::InsertNotification(n) => {
                Change::new(Collection::Notifications, n.id, vec![n.user_id])
            }
            WriteOp::InsertCheckIn(c) => Change::new(Collection::CheckIns, c.id, vec![c.user_id]),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn insert_request(&mut self, request: RelationshipRequest) -> &mut Self {
        self.push(WriteOp::InsertRequest(request))
    }

    pub fn resolve_request(
        &mut self,
        request: &RelationshipRequest,
        status: RequestStatus,
        at: DateTime<Utc>,
    ) -> &mut Self {
        self.push(WriteOp::ResolveRequest {
            id: request.id,
            from: request.from_user_id,
            to: request.to_user_id,
            status,
            at,
        })
    }

    pub fn insert_edge(&mut self, edge: ContactEdge) -> &mut Self {
        self.push(WriteOp::InsertEdge(edge))
    }

    pub fn insert_notification(&mut self, notification: Notification) -> &mut Self {
        self.push(WriteOp::InsertNotification(notification))
    }

    pub fn insert_check_in(&mut self, check_in: CheckIn) -> &mut Self {
        self.push(WriteOp::InsertCheckIn(check_in))
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Notifications this batch will create, in order.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.ops.iter().filter_map(|op| match op {
            WriteOp::InsertNotification(n) => Some(n),
            _ => None,
        })
    }
}

impl Database {
    /// Apply every op of `batch` in one transaction.
    ///
    /// On any failure the transaction is rolled back and the error of the
    /// first failing op is returned; nothing is published.
    pub fn commit(&mut self, batch: &WriteBatch) -> Result<Vec<Change>> {
        let tx = self.conn_mut().transaction()?;
        for op in batch.ops() {
            match op {
                WriteOp::InsertRequest(r) => insert_request(&tx, r)?,
                WriteOp::ResolveRequest { id, status, at, .. } => {
                    resolve_request(&tx, *id, *status, *at)?
                }
                WriteOp::InsertEdge(e) => insert_edge(&tx, e)?,
                WriteOp::InsertNotification(n) => insert_notification(&tx, n)?,
                WriteOp::InsertCheckIn(c) => insert_check_in(&tx, c)?,
            }
        }
        tx.commit()?;

        let changes: Vec<Change> = batch.ops().iter().map(WriteOp::change).collect();
        debug!(ops = batch.len(), "write batch committed");
        self.feed().publish_all(changes.clone());
        Ok(changes)
    }
}
