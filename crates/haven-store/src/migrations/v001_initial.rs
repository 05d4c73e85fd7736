//! v001 -- Initial schema creation.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id             TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    email          TEXT NOT NULL UNIQUE,       -- trimmed, lowercase
    password_hash  TEXT NOT NULL,              -- argon2 PHC string
    display_name   TEXT,
    phone          TEXT,
    address        TEXT,
    photo_url      TEXT,
    email_verified INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    created_at     TEXT NOT NULL,              -- RFC-3339
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token      TEXT PRIMARY KEY NOT NULL,
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS email_verifications (
    token      TEXT PRIMARY KEY NOT NULL,
    user_id    TEXT NOT NULL,
    expires_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Relationship requests (friend + family)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS relationship_requests (
    id              TEXT PRIMARY KEY NOT NULL,
    kind            TEXT NOT NULL,             -- friend | family
    from_user_id    TEXT NOT NULL,
    from_user_name  TEXT NOT NULL,
    from_user_email TEXT NOT NULL,
    to_user_id      TEXT NOT NULL,
    to_user_name    TEXT NOT NULL,
    to_user_email   TEXT NOT NULL,
    relationship    TEXT,                      -- family role label
    nickname        TEXT,
    phone           TEXT,
    status          TEXT NOT NULL,             -- pending | accepted | rejected
    created_at      TEXT NOT NULL,
    resolved_at     TEXT,

    CHECK (from_user_id <> to_user_id)
);

-- At most one pending request per (from, to, kind).
CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_one_pending
    ON relationship_requests(from_user_id, to_user_id, kind)
    WHERE status = 'pending';

CREATE INDEX IF NOT EXISTS idx_requests_to_status
    ON relationship_requests(to_user_id, status);

-- ----------------------------------------------------------------
-- Contact edges (one row per direction)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contact_edges (
    owner_id     TEXT NOT NULL,
    target_id    TEXT NOT NULL,
    kind         TEXT NOT NULL,
    target_name  TEXT NOT NULL,
    target_email TEXT NOT NULL,
    relationship TEXT,
    nickname     TEXT,
    phone        TEXT,
    can_track    INTEGER NOT NULL DEFAULT 1,
    added_at     TEXT NOT NULL,

    PRIMARY KEY (owner_id, target_id, kind),
    CHECK (owner_id <> target_id)
);

CREATE INDEX IF NOT EXISTS idx_edges_target ON contact_edges(target_id);

-- ----------------------------------------------------------------
-- Notifications
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id             TEXT PRIMARY KEY NOT NULL,
    user_id        TEXT NOT NULL,              -- recipient
    kind           TEXT NOT NULL,
    title          TEXT NOT NULL,
    message        TEXT NOT NULL,
    from_user_id   TEXT,
    from_user_name TEXT,
    read           INTEGER NOT NULL DEFAULT 0,
    payload        TEXT NOT NULL DEFAULT '{}', -- JSON
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user_ts
    ON notifications(user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Check-ins
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS check_ins (
    id         TEXT PRIMARY KEY NOT NULL,
    user_id    TEXT NOT NULL,
    user_name  TEXT NOT NULL,
    status     TEXT NOT NULL,                  -- safe | warning | danger
    location   TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_check_ins_user_ts
    ON check_ins(user_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
