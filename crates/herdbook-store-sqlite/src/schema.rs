//! SQL schema for the Herdbook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS barns (
    group_id  TEXT PRIMARY KEY,
    name      TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS sections (
    subgroup_id TEXT PRIMARY KEY,
    group_id    TEXT NOT NULL REFERENCES barns(group_id),
    name        TEXT NOT NULL,
    UNIQUE (group_id, name)
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id    TEXT PRIMARY KEY,   -- farmer-assigned tag
    birth_date    TEXT NOT NULL,      -- YYYY-MM-DD
    sex           TEXT NOT NULL,
    breed         TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'ACTIVE',   -- 'ACTIVE' | 'TERMINATED'
    terminated_on TEXT,
    notes         TEXT,
    group_id      TEXT REFERENCES barns(group_id),
    subgroup_id   TEXT REFERENCES sections(subgroup_id)
);

-- Observations are append-only; rows leave only with their subject.
CREATE TABLE IF NOT EXISTS observations (
    observation_id TEXT PRIMARY KEY,
    subject_id     TEXT NOT NULL REFERENCES subjects(subject_id) ON DELETE CASCADE,
    date           TEXT NOT NULL,     -- YYYY-MM-DD
    value          REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS actors (
    actor_id      TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,      -- argon2 PHC string
    role          TEXT NOT NULL,      -- 'ADMIN' | 'FARMER' | 'HELPER'
    group_id      TEXT REFERENCES barns(group_id)
);

CREATE INDEX IF NOT EXISTS observations_subject_idx ON observations(subject_id, date);
CREATE INDEX IF NOT EXISTS subjects_group_idx       ON subjects(group_id);

PRAGMA user_version = 1;
";
