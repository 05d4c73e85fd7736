//! # haven-store
//!
//! Document storage for Haven, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers and equality
//! queries for every collection. Writes that must land together go through a
//! [`WriteBatch`], committed inside a single transaction. Every committed
//! write is published on the [`ChangeFeed`] so that live queries can
//! recompute their snapshot.

pub mod batch;
pub mod checkins;
pub mod contacts;
pub mod database;
pub mod feed;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod requests;
pub mod sessions;
pub mod users;

mod convert;
mod error;

pub use batch::{WriteBatch, WriteOp};
pub use database::Database;
pub use error::{Result, StoreError};
pub use feed::{Change, ChangeFeed, Collection};
pub use models::*;
