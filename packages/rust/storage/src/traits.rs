//! Store contracts the pipeline depends on.
//!
//! The pipeline receives one [`PressStore`] handle at construction, so the
//! libSQL [`Storage`](crate::Storage) and the in-memory
//! [`MemoryStore`](crate::MemoryStore) are interchangeable.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;

use press_shared::{
    Activity, Article, Metadata, Result, Snapshot, SourceId, SourceKind, SourceRef, Subject,
    SubjectId,
};

/// Deduplicates source URLs by identity.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// Register `url`, returning its stable reference.
    ///
    /// Idempotent: repeated calls with the same URL return the same reference,
    /// and the `kind` given on the first call is kept.
    async fn register_source(&self, url: &str, kind: SourceKind) -> Result<SourceId>;

    /// Look up a registered source by URL.
    async fn get_source(&self, url: &str) -> Result<Option<SourceRef>>;
}

/// Subject identity records, keyed by name.
#[async_trait]
pub trait SubjectStore: Send + Sync {
    /// Create the subject on first call for `name`, otherwise overwrite its
    /// summary and metadata and touch `updated_at`.
    async fn upsert_subject(
        &self,
        name: &str,
        summary: Option<&str>,
        metadata: &Metadata,
    ) -> Result<SubjectId>;

    async fn get_subject(&self, name: &str) -> Result<Option<Subject>>;

    /// All known subjects ordered by name.
    async fn list_subjects(&self) -> Result<Vec<Subject>>;
}

/// Append-only activity log.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Always creates a new row; never merges with an existing one.
    async fn append_activity(
        &self,
        subject: &SubjectId,
        title: &str,
        content: &str,
        source: Option<&SourceId>,
        published_at: Option<&str>,
    ) -> Result<String>;

    /// Activities for a subject in insertion order.
    async fn list_activities(&self, subject: &SubjectId) -> Result<Vec<Activity>>;
}

/// Per-subject snapshot history.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Most recent snapshot for a subject.
    async fn latest_snapshot(&self, subject: &SubjectId) -> Result<Option<Snapshot>>;

    async fn append_snapshot(
        &self,
        subject: &SubjectId,
        taken_on: NaiveDate,
        diff: &str,
        content: &str,
    ) -> Result<String>;

    /// Snapshots for a subject, oldest first.
    async fn list_snapshots(&self, subject: &SubjectId) -> Result<Vec<Snapshot>>;

    /// Diff text of the most recent snapshot.
    async fn latest_snapshot_diff(&self, subject: &SubjectId) -> Result<Option<String>> {
        Ok(self.latest_snapshot(subject).await?.map(|s| s.diff))
    }
}

/// Rendered article history (one row per run).
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn append_article(
        &self,
        subject: &SubjectId,
        title: &str,
        markdown: &str,
        html: &str,
    ) -> Result<String>;

    async fn list_articles(&self, subject: &SubjectId) -> Result<Vec<Article>>;
}

/// One LLM call to record in the audit log.
#[derive(Debug, Clone, Default)]
pub struct LlmCall<'a> {
    pub subject: Option<&'a SubjectId>,
    /// What the call was for, e.g. `page_summary` or `article_generation`.
    pub kind: &'a str,
    pub url: Option<&'a str>,
    pub prompt: Option<&'a str>,
    pub response: Option<&'a str>,
}

/// Sink for LLM call audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_llm_call(&self, call: &LlmCall<'_>) -> Result<String>;
}

/// Record an LLM call, swallowing any failure. Returns the row id on success.
pub async fn record_quietly<S>(sink: &S, call: &LlmCall<'_>) -> Option<String>
where
    S: AuditSink + ?Sized,
{
    match sink.record_llm_call(call).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(kind = call.kind, error = %e, "failed to record LLM call");
            None
        }
    }
}

/// Everything the pipeline needs from persistence, as one handle.
pub trait PressStore:
    SubjectStore + SourceRegistry + ActivityStore + SnapshotStore + ArticleStore + AuditSink
{
}

impl<T> PressStore for T where
    T: SubjectStore + SourceRegistry + ActivityStore + SnapshotStore + ArticleStore + AuditSink
{
}
