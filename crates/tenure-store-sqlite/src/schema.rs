//! SQL schema for the Tenure SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS designations (
    code   TEXT PRIMARY KEY,
    title  TEXT NOT NULL,
    rank   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS employees (
    employee_id          INTEGER PRIMARY KEY,
    name                 TEXT NOT NULL,
    initial_designation  TEXT NOT NULL,   -- immutable after insert
    current_designation  TEXT NOT NULL,   -- cache of the chain tail
    hired_on             TEXT NOT NULL,   -- ISO 8601 date
    status               TEXT NOT NULL DEFAULT 'active'   -- 'active' | 'inactive'
);

-- One row per chain node. Invariants are enforced by the engine, not here;
-- the UNIQUE constraint only backs up the one-event-per-date rule.
CREATE TABLE IF NOT EXISTS promotions (
    event_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id       INTEGER NOT NULL REFERENCES employees(employee_id),
    from_designation  TEXT NOT NULL,
    to_designation    TEXT NOT NULL,
    effective_date    TEXT NOT NULL,      -- ISO 8601 date; sorts lexically
    level             INTEGER NOT NULL DEFAULT 0,
    remarks           TEXT,
    UNIQUE (employee_id, effective_date)
);

PRAGMA user_version = 1;
";
