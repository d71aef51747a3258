//! SQL schema for the rollcall SQLite store.
//!
//! Executed once at connection startup. Migrations are gated on
//! `PRAGMA user_version`.

/// Version 1 stores lacked the clamped attendance time on check-ins.
pub const MIGRATE_V1: &str = "
ALTER TABLE checkins ADD COLUMN effective_at TEXT;
";

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    email        TEXT PRIMARY KEY,
    display_name TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS class_schedules (
    class_id TEXT PRIMARY KEY,
    start_at TEXT NOT NULL,
    end_at   TEXT NOT NULL,
    CHECK (start_at <= end_at)
);

-- Timestamps use a fixed-width RFC 3339 form so that text order is
-- chronological order.
CREATE TABLE IF NOT EXISTS checkins (
    checkin_id   TEXT PRIMARY KEY,
    email        TEXT NOT NULL,
    class_id     TEXT NOT NULL,
    section      TEXT NOT NULL,
    status       TEXT,            -- NULL when unset
    timestamp    TEXT NOT NULL,
    effective_at TEXT,            -- clamped time, set once reconciled as Present
    version      INTEGER NOT NULL DEFAULT 0
);

-- Written only through CounterStore::apply_update.
CREATE TABLE IF NOT EXISTS user_counters (
    email         TEXT PRIMARY KEY,
    present       INTEGER NOT NULL DEFAULT 0 CHECK (present   >= 0),
    excused       INTEGER NOT NULL DEFAULT 0 CHECK (excused   >= 0),
    dishonest     INTEGER NOT NULL DEFAULT 0 CHECK (dishonest >= 0),
    last_attended TEXT
);

-- One row per trigger delivery that changed counters. Rows older than the
-- configured retention are pruned at startup.
CREATE TABLE IF NOT EXISTS applied_events (
    event_key  TEXT PRIMARY KEY,
    email      TEXT NOT NULL,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reconcile_failures (
    failure_id  TEXT PRIMARY KEY,
    event_json  TEXT NOT NULL,
    error       TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS checkins_present_idx
    ON checkins(email, section, status, timestamp);

CREATE INDEX IF NOT EXISTS applied_events_age_idx
    ON applied_events(applied_at);

PRAGMA user_version = 2;
";
