//! SQLite schema for recorded load-test results.
//!
//! Tables:
//! - `projects`, `tests`: named definitions; test thresholds as JSON text
//! - `runs`: aggregate stats; distributions and options as JSON text
//!   (empty string when absent)
//! - `latency_distributions`, `buckets`: per-run child rows
//! - `details`: per-request samples, append-mostly
//!
//! Durations are stored as integer nanoseconds, instants as RFC 3339 text.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tests (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id    INTEGER NOT NULL REFERENCES projects(id),
    name          TEXT NOT NULL UNIQUE,
    description   TEXT NOT NULL DEFAULT '',
    status        TEXT NOT NULL DEFAULT 'ok',
    thresholds    TEXT NOT NULL DEFAULT '',
    fail_on_error INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS runs (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    test_id          INTEGER NOT NULL REFERENCES tests(id),
    date             TEXT NOT NULL,
    count            INTEGER NOT NULL DEFAULT 0,
    total            INTEGER NOT NULL DEFAULT 0,
    average          INTEGER NOT NULL DEFAULT 0,
    fastest          INTEGER NOT NULL DEFAULT 0,
    slowest          INTEGER NOT NULL DEFAULT 0,
    rps              REAL NOT NULL DEFAULT 0,
    status           TEXT NOT NULL DEFAULT 'ok',
    options          TEXT NOT NULL DEFAULT '',
    error_dist       TEXT NOT NULL DEFAULT '',
    status_code_dist TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS latency_distributions (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id     INTEGER NOT NULL REFERENCES runs(id),
    percentage INTEGER NOT NULL,
    latency    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS buckets (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id    INTEGER NOT NULL REFERENCES runs(id),
    mark      REAL NOT NULL,
    count     INTEGER NOT NULL,
    frequency REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS details (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id     INTEGER NOT NULL REFERENCES runs(id),
    timestamp  TEXT,
    latency    REAL NOT NULL,
    error      TEXT NOT NULL DEFAULT '',
    status     TEXT NOT NULL DEFAULT 'OK',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tests_project_id ON tests(project_id);
CREATE INDEX IF NOT EXISTS idx_runs_test_id ON runs(test_id);
CREATE INDEX IF NOT EXISTS idx_latency_distributions_run_id ON latency_distributions(run_id);
CREATE INDEX IF NOT EXISTS idx_buckets_run_id ON buckets(run_id);
CREATE INDEX IF NOT EXISTS idx_details_run_id ON details(run_id);
"#;
