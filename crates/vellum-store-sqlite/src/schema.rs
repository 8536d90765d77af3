//! SQL schema for the Vellum SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS documents (
    document_id               TEXT PRIMARY KEY,
    subject_id                TEXT NOT NULL,
    status                    TEXT NOT NULL,     -- DocumentStatus, snake_case
    current_version           INTEGER NOT NULL CHECK (current_version >= 1),
    content                   TEXT NOT NULL,     -- copy of the newest version
    template_ref              TEXT,
    signed_at                 TEXT,              -- RFC 3339 UTC; set once
    cancelled_at              TEXT,              -- RFC 3339 UTC; set once
    cancellation_reason       TEXT,
    cancellation_requested_by TEXT,              -- 'owner' | 'counterparty'
    created_by                TEXT NOT NULL,
    created_at                TEXT NOT NULL,
    updated_at                TEXT NOT NULL
);

-- At most one non-cancelled document per subject.
CREATE UNIQUE INDEX IF NOT EXISTS documents_active_subject_idx
    ON documents(subject_id) WHERE status != 'cancelled';

CREATE INDEX IF NOT EXISTS documents_subject_idx ON documents(subject_id);

-- Versions are strictly append-only.
-- No UPDATE is ever issued against this table; rows only disappear together
-- with their (pre-signature) document.
CREATE TABLE IF NOT EXISTS versions (
    document_id    TEXT NOT NULL REFERENCES documents(document_id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL CHECK (version_number >= 1),
    content        TEXT NOT NULL,
    status_at_time TEXT NOT NULL,
    change_type    TEXT NOT NULL,
    change_reason  TEXT,
    created_by     TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    PRIMARY KEY (document_id, version_number)
);

CREATE TRIGGER IF NOT EXISTS versions_append_only
    BEFORE UPDATE ON versions
BEGIN
    SELECT RAISE(ABORT, 'versions are append-only');
END;

PRAGMA user_version = 1;
";
