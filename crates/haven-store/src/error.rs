use haven_shared::RequestId;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// JSON (de)serialisation of an embedded payload column.
    #[error("Payload error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pending request already exists for the same (from, to, kind).
    #[error("A pending request already exists for this pair")]
    DuplicatePending,

    /// A contact edge with the same (owner, target, kind) already exists.
    #[error("Contact edge already exists")]
    EdgeExists,

    /// An email address is already registered to another user.
    #[error("Email already registered")]
    EmailTaken,

    /// A conditional request update found the request no longer pending.
    #[error("Request {0} is no longer pending")]
    RequestNotPending(RequestId),
}

impl StoreError {
    /// Whether the failure is transient: the database was busy, locked,
    /// or the underlying file could not be read or written.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Io(_) | StoreError::NoDataDir => true,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::SystemIoFailure
                    | rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::DiskFull
                    | rusqlite::ErrorCode::OutOfMemory
            ),
            _ => false,
        }
    }
}

/// Whether a rusqlite error is a constraint violation (UNIQUE, PRIMARY KEY).
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Map `QueryReturnedNoRows` to [`StoreError::NotFound`].
pub(crate) fn not_found(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
