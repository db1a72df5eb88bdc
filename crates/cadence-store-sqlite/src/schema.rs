//! SQL schema for the Cadence SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Only `end_condition` is ever updated after insert.
-- `base_event_id` carries no foreign key: a rule may outlive its template.
CREATE TABLE IF NOT EXISTS recurrence_rules (
    rule_id         TEXT PRIMARY KEY,
    base_event_id   TEXT,
    repeat_interval INTEGER NOT NULL CHECK (repeat_interval >= 1),
    pattern         TEXT NOT NULL,   -- JSON-encoded Pattern
    end_condition   TEXT NOT NULL,   -- JSON-encoded EndCondition
    start_anchor    TEXT NOT NULL,   -- RFC 3339 UTC, whole seconds
    timezone        TEXT NOT NULL,   -- IANA name
    created_at      TEXT NOT NULL
);

-- Standalone events, base events, and materialised occurrences.
-- NULL recurrence ids are distinct under UNIQUE, so only instances are
-- constrained to one row per (rule, start).
CREATE TABLE IF NOT EXISTS events (
    event_id      TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    description   TEXT,
    location      TEXT,
    start_at      TEXT NOT NULL,   -- RFC 3339 UTC, whole seconds
    stop_at       TEXT NOT NULL,
    all_day       INTEGER NOT NULL DEFAULT 0,
    timezone      TEXT,
    privacy       TEXT NOT NULL DEFAULT 'public',
    show_as       TEXT NOT NULL DEFAULT 'busy',
    attendees     TEXT NOT NULL DEFAULT '[]',
    attachments   TEXT NOT NULL DEFAULT '[]',
    recurrency    INTEGER NOT NULL DEFAULT 0,
    recurrence_id TEXT REFERENCES recurrence_rules(rule_id) ON DELETE CASCADE,
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    UNIQUE (recurrence_id, start_at)
);

CREATE TABLE IF NOT EXISTS recurrence_exceptions (
    exception_id         TEXT PRIMARY KEY,
    rule_id              TEXT NOT NULL
                         REFERENCES recurrence_rules(rule_id) ON DELETE CASCADE,
    exception_date       TEXT NOT NULL,   -- original occurrence start
    is_deleted           INTEGER NOT NULL DEFAULT 0,
    replacement_event_id TEXT REFERENCES events(event_id) ON DELETE SET NULL,
    created_at           TEXT NOT NULL,
    UNIQUE (rule_id, exception_date)
);

CREATE INDEX IF NOT EXISTS events_start_idx      ON events(start_at);
CREATE INDEX IF NOT EXISTS events_recurrence_idx ON events(recurrence_id);

PRAGMA user_version = 1;
";
