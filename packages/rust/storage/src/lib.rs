//! Turso Embedded / libSQL storage layer.
//!
//! The [`Storage`] struct wraps a libSQL database holding subjects, the source
//! registry, the activity log, snapshots, rendered articles, and the LLM audit log.
//! It implements every store contract in [`traits`]; [`MemoryStore`] implements the
//! same contracts in memory.
//!
//! **Access rules:**
//! - `press run`: read-write via [`Storage::open`]
//! - `press index` / `press history`: read-only via [`Storage::open_readonly`]
//!
//! Every write is a single autocommitted statement. No transaction spans more
//! than one operation, so writes committed by one pipeline stage survive a
//! failure in a later one.

mod memory;
mod migrations;
pub mod traits;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database, params};
use uuid::Uuid;

use press_shared::{
    Activity, Article, Metadata, PressError, Result, Snapshot, SourceId, SourceKind, SourceRef,
    Subject, SubjectId,
};

pub use memory::{MemoryStore, RecordedCall};
pub use traits::{
    ActivityStore, ArticleStore, AuditSink, LlmCall, PressStore, SnapshotStore, SourceRegistry,
    SubjectStore, record_quietly,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PressError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PressError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        PressError::Storage(format!("migration v{} failed: {e}", migration.version))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(PressError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Fetch the id of a subject by name.
    async fn subject_id_by_name(&self, name: &str) -> Result<Option<SubjectId>> {
        let mut rows = self
            .conn
            .query("SELECT id FROM subjects WHERE name = ?1", params![name])
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(parse_id(&row.get::<String>(0).map_err(db_err)?)?)),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Subject operations
// ---------------------------------------------------------------------------

#[async_trait]
impl SubjectStore for Storage {
    async fn upsert_subject(
        &self,
        name: &str,
        summary: Option<&str>,
        metadata: &Metadata,
    ) -> Result<SubjectId> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| PressError::Storage(format!("metadata encode failed: {e}")))?;

        self.conn
            .execute(
                "INSERT INTO subjects (id, name, summary, metadata_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(name) DO UPDATE SET
                   summary = excluded.summary,
                   metadata_json = excluded.metadata_json,
                   updated_at = excluded.updated_at",
                params![
                    SubjectId::new().to_string(),
                    name,
                    summary,
                    metadata_json.as_str(),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;

        self.subject_id_by_name(name)
            .await?
            .ok_or_else(|| PressError::Storage(format!("subject '{name}' missing after upsert")))
    }

    async fn get_subject(&self, name: &str) -> Result<Option<Subject>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, summary, metadata_json, created_at, updated_at
                 FROM subjects WHERE name = ?1",
                params![name],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_subject(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, summary, metadata_json, created_at, updated_at
                 FROM subjects ORDER BY name",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_subject(&row)?);
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Source registry
// ---------------------------------------------------------------------------

#[async_trait]
impl SourceRegistry for Storage {
    async fn register_source(&self, url: &str, kind: SourceKind) -> Result<SourceId> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO sources (id, url, kind, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(url) DO NOTHING",
                params![SourceId::new().to_string(), url, kind.as_str(), now.as_str()],
            )
            .await
            .map_err(db_err)?;

        self.get_source(url)
            .await?
            .map(|s| s.id)
            .ok_or_else(|| PressError::Storage(format!("source '{url}' missing after insert")))
    }

    async fn get_source(&self, url: &str) -> Result<Option<SourceRef>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, url, kind FROM sources WHERE url = ?1",
                params![url],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(SourceRef {
                id: parse_id(&row.get::<String>(0).map_err(db_err)?)?,
                url: row.get::<String>(1).map_err(db_err)?,
                kind: row.get::<String>(2).map_err(db_err)?.parse()?,
            })),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Activity operations
// ---------------------------------------------------------------------------

#[async_trait]
impl ActivityStore for Storage {
    async fn append_activity(
        &self,
        subject: &SubjectId,
        title: &str,
        content: &str,
        source: Option<&SourceId>,
        published_at: Option<&str>,
    ) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO activities (id, subject_id, source_id, title, content, published_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.as_str(),
                    subject.to_string(),
                    source.map(|s| s.to_string()),
                    title,
                    content,
                    published_at,
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    async fn list_activities(&self, subject: &SubjectId) -> Result<Vec<Activity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, subject_id, source_id, title, content, published_at, created_at
                 FROM activities WHERE subject_id = ?1 ORDER BY id",
                params![subject.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_activity(&row)?);
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Snapshot operations
// ---------------------------------------------------------------------------

#[async_trait]
impl SnapshotStore for Storage {
    async fn latest_snapshot(&self, subject: &SubjectId) -> Result<Option<Snapshot>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, subject_id, taken_on, diff, content, created_at
                 FROM snapshots WHERE subject_id = ?1
                 ORDER BY taken_on DESC, id DESC LIMIT 1",
                params![subject.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_snapshot(&row)?)),
            None => Ok(None),
        }
    }

    async fn append_snapshot(
        &self,
        subject: &SubjectId,
        taken_on: NaiveDate,
        diff: &str,
        content: &str,
    ) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO snapshots (id, subject_id, taken_on, diff, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    subject.to_string(),
                    taken_on.to_string(),
                    diff,
                    content,
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    async fn list_snapshots(&self, subject: &SubjectId) -> Result<Vec<Snapshot>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, subject_id, taken_on, diff, content, created_at
                 FROM snapshots WHERE subject_id = ?1 ORDER BY taken_on, id",
                params![subject.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_snapshot(&row)?);
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Article operations
// ---------------------------------------------------------------------------

#[async_trait]
impl ArticleStore for Storage {
    async fn append_article(
        &self,
        subject: &SubjectId,
        title: &str,
        markdown: &str,
        html: &str,
    ) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO articles (id, subject_id, title, markdown, html, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    subject.to_string(),
                    title,
                    markdown,
                    html,
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    async fn list_articles(&self, subject: &SubjectId) -> Result<Vec<Article>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, subject_id, title, markdown, html, created_at
                 FROM articles WHERE subject_id = ?1 ORDER BY id",
                params![subject.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(Article {
                id: row.get::<String>(0).map_err(db_err)?,
                subject_id: parse_id(&row.get::<String>(1).map_err(db_err)?)?,
                title: row.get::<String>(2).map_err(db_err)?,
                markdown: row.get::<String>(3).map_err(db_err)?,
                html: row.get::<String>(4).map_err(db_err)?,
                created_at: parse_timestamp(&row.get::<String>(5).map_err(db_err)?)?,
            });
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// LLM audit log
// ---------------------------------------------------------------------------

#[async_trait]
impl AuditSink for Storage {
    async fn record_llm_call(&self, call: &LlmCall<'_>) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO llm_logs (id, subject_id, call_kind, url, prompt, response, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.as_str(),
                    call.subject.map(|s| s.to_string()),
                    call.kind,
                    call.url,
                    call.prompt,
                    call.response,
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn db_err(e: libsql::Error) -> PressError {
    PressError::Storage(e.to_string())
}

fn parse_id<T: std::str::FromStr<Err = uuid::Error>>(s: &str) -> Result<T> {
    s.parse()
        .map_err(|e| PressError::Storage(format!("invalid id '{s}': {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PressError::Storage(format!("invalid date: {e}")))
}

/// Convert a database row to a [`Subject`].
fn row_to_subject(row: &libsql::Row) -> Result<Subject> {
    let metadata_json: String = row.get(3).map_err(db_err)?;
    let metadata: Metadata = serde_json::from_str(&metadata_json)
        .map_err(|e| PressError::Storage(format!("invalid metadata: {e}")))?;

    Ok(Subject {
        id: parse_id(&row.get::<String>(0).map_err(db_err)?)?,
        name: row.get::<String>(1).map_err(db_err)?,
        summary: row.get::<String>(2).ok(),
        metadata,
        created_at: parse_timestamp(&row.get::<String>(4).map_err(db_err)?)?,
        updated_at: parse_timestamp(&row.get::<String>(5).map_err(db_err)?)?,
    })
}

/// Convert a database row to an [`Activity`].
fn row_to_activity(row: &libsql::Row) -> Result<Activity> {
    let source_id = match row.get::<String>(2).ok() {
        Some(s) => Some(parse_id(&s)?),
        None => None,
    };

    Ok(Activity {
        id: row.get::<String>(0).map_err(db_err)?,
        subject_id: parse_id(&row.get::<String>(1).map_err(db_err)?)?,
        source_id,
        title: row.get::<String>(3).map_err(db_err)?,
        content: row.get::<String>(4).map_err(db_err)?,
        published_at: row.get::<String>(5).ok(),
        created_at: parse_timestamp(&row.get::<String>(6).map_err(db_err)?)?,
    })
}

/// Convert a database row to a [`Snapshot`].
fn row_to_snapshot(row: &libsql::Row) -> Result<Snapshot> {
    let taken_on: String = row.get(2).map_err(db_err)?;

    Ok(Snapshot {
        id: row.get::<String>(0).map_err(db_err)?,
        subject_id: parse_id(&row.get::<String>(1).map_err(db_err)?)?,
        taken_on: NaiveDate::parse_from_str(&taken_on, "%Y-%m-%d")
            .map_err(|e| PressError::Storage(format!("invalid snapshot date: {e}")))?,
        diff: row.get::<String>(3).map_err(db_err)?,
        content: row.get::<String>(4).map_err(db_err)?,
        created_at: parse_timestamp(&row.get::<String>(5).map_err(db_err)?)?,
    })
}
