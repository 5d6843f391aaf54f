//! SQL migration definitions for the press database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: subjects, sources, activities, snapshots, articles, llm_logs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Tracked subjects, keyed by name
CREATE TABLE IF NOT EXISTS subjects (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    summary       TEXT,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Deduplicated source URLs; kind is fixed at first insert
CREATE TABLE IF NOT EXISTS sources (
    id         TEXT PRIMARY KEY,
    url        TEXT NOT NULL UNIQUE,
    kind       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Append-only activity log
CREATE TABLE IF NOT EXISTS activities (
    id           TEXT PRIMARY KEY,
    subject_id   TEXT NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    source_id    TEXT REFERENCES sources(id),
    title        TEXT NOT NULL,
    content      TEXT NOT NULL,
    published_at TEXT,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activities_subject ON activities(subject_id);

-- Run-over-run change history
CREATE TABLE IF NOT EXISTS snapshots (
    id         TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    taken_on   TEXT NOT NULL,
    diff       TEXT NOT NULL,
    content    TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_subject ON snapshots(subject_id, taken_on);

-- Rendered articles, one row per run
CREATE TABLE IF NOT EXISTS articles (
    id         TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    title      TEXT NOT NULL,
    markdown   TEXT NOT NULL,
    html       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_subject ON articles(subject_id);

-- LLM call audit log
CREATE TABLE IF NOT EXISTS llm_logs (
    id         TEXT PRIMARY KEY,
    subject_id TEXT REFERENCES subjects(id) ON DELETE SET NULL,
    call_kind  TEXT NOT NULL,
    url        TEXT,
    prompt     TEXT,
    response   TEXT,
    created_at TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
