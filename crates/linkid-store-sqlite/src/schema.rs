//! SQL schema for the linkid SQLite store.
//!
//! [`PRAGMAS`] run on every connection. [`SCHEMA`] runs only when the
//! database's `PRAGMA user_version` is below [`SCHEMA_VERSION`]; a database
//! written by a newer release is refused.

/// Version recorded in `PRAGMA user_version` once [`SCHEMA`] has run.
pub const SCHEMA_VERSION: i64 = 1;

/// Per-connection settings.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Schema DDL for version 1; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
-- email/phone are written once; only precedence, linked_id and updated_at
-- ever change. Rows are tombstoned via deleted_at, never removed.
CREATE TABLE IF NOT EXISTS contacts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    email       TEXT,
    phone       TEXT,
    linked_id   INTEGER REFERENCES contacts(id),
    precedence  TEXT NOT NULL,   -- 'primary' | 'secondary'
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, fixed width; server-assigned
    updated_at  TEXT NOT NULL,
    deleted_at  TEXT,
    CHECK (precedence IN ('primary', 'secondary')),
    CHECK ((precedence = 'primary') = (linked_id IS NULL))
);

CREATE INDEX IF NOT EXISTS contacts_email_idx  ON contacts(email);
CREATE INDEX IF NOT EXISTS contacts_phone_idx  ON contacts(phone);
CREATE INDEX IF NOT EXISTS contacts_linked_idx ON contacts(linked_id);

PRAGMA user_version = 1;
";
