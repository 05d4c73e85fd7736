//! # haven-core
//!
//! Relationship, check-in and notification logic for Haven.
//!
//! Every operation takes the acting user explicitly as an [`Actor`]; there
//! is no ambient "current user". All writes that belong to one logical
//! operation (a request and its notification, an accepted edge pair and the
//! request status, a check-in and its fan-out) are committed as a single
//! [`WriteBatch`](haven_store::WriteBatch).

pub mod checkin;
pub mod error;
pub mod identity;
pub mod mail;
pub mod notifications;
pub mod profile;
pub mod push;
pub mod requests;
pub mod resolve;
pub mod service;
pub mod watch;

pub use error::{CoreError, ErrorClass, Result};
pub use identity::Actor;
pub use notifications::Filter;
pub use requests::NewRequest;
pub use profile::ProfileUpdate;
pub use service::{CoreConfig, Haven};
pub use watch::Subscription;
