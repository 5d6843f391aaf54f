//! In-memory implementation of every store contract.
//!
//! Used by tests in place of [`crate::Storage`]. Also records LLM audit calls
//! so tests can inspect them.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use press_shared::{
    Activity, Article, Metadata, PressError, Result, Snapshot, SourceId, SourceKind, SourceRef,
    Subject, SubjectId,
};

use crate::traits::{
    ActivityStore, ArticleStore, AuditSink, LlmCall, SnapshotStore, SourceRegistry, SubjectStore,
};

/// An audit row as kept by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub subject: Option<SubjectId>,
    pub kind: String,
    pub url: Option<String>,
    pub prompt: Option<String>,
    pub response: Option<String>,
}

#[derive(Default)]
struct Inner {
    subjects: Vec<Subject>,
    sources: Vec<SourceRef>,
    activities: Vec<Activity>,
    snapshots: Vec<Snapshot>,
    articles: Vec<Article>,
    llm_calls: Vec<RecordedCall>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| PressError::Storage("memory store lock poisoned".into()))
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.lock().map(|g| g.sources.len()).unwrap_or(0)
    }

    /// Audit rows recorded so far, oldest first.
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.lock().map(|g| g.llm_calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SubjectStore for MemoryStore {
    async fn upsert_subject(
        &self,
        name: &str,
        summary: Option<&str>,
        metadata: &Metadata,
    ) -> Result<SubjectId> {
        let mut inner = self.lock()?;
        let now = Utc::now();

        if let Some(existing) = inner.subjects.iter_mut().find(|s| s.name == name) {
            existing.summary = summary.map(str::to_string);
            existing.metadata = metadata.clone();
            existing.updated_at = now;
            return Ok(existing.id.clone());
        }

        let id = SubjectId::new();
        inner.subjects.push(Subject {
            id: id.clone(),
            name: name.to_string(),
            summary: summary.map(str::to_string),
            metadata: metadata.clone(),
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn get_subject(&self, name: &str) -> Result<Option<Subject>> {
        Ok(self.lock()?.subjects.iter().find(|s| s.name == name).cloned())
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        let mut subjects = self.lock()?.subjects.clone();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }
}

#[async_trait]
impl SourceRegistry for MemoryStore {
    async fn register_source(&self, url: &str, kind: SourceKind) -> Result<SourceId> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.sources.iter().find(|s| s.url == url) {
            return Ok(existing.id.clone());
        }
        let id = SourceId::new();
        inner.sources.push(SourceRef {
            id: id.clone(),
            url: url.to_string(),
            kind,
        });
        Ok(id)
    }

    async fn get_source(&self, url: &str) -> Result<Option<SourceRef>> {
        Ok(self.lock()?.sources.iter().find(|s| s.url == url).cloned())
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn append_activity(
        &self,
        subject: &SubjectId,
        title: &str,
        content: &str,
        source: Option<&SourceId>,
        published_at: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        self.lock()?.activities.push(Activity {
            id: id.clone(),
            subject_id: subject.clone(),
            source_id: source.cloned(),
            title: title.to_string(),
            content: content.to_string(),
            published_at: published_at.map(str::to_string),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_activities(&self, subject: &SubjectId) -> Result<Vec<Activity>> {
        Ok(self
            .lock()?
            .activities
            .iter()
            .filter(|a| &a.subject_id == subject)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn latest_snapshot(&self, subject: &SubjectId) -> Result<Option<Snapshot>> {
        // Later insertion wins ties on the same date
        Ok(self
            .lock()?
            .snapshots
            .iter()
            .filter(|s| &s.subject_id == subject)
            .max_by(|a, b| a.taken_on.cmp(&b.taken_on))
            .cloned())
    }

    async fn append_snapshot(
        &self,
        subject: &SubjectId,
        taken_on: NaiveDate,
        diff: &str,
        content: &str,
    ) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        self.lock()?.snapshots.push(Snapshot {
            id: id.clone(),
            subject_id: subject.clone(),
            taken_on,
            diff: diff.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_snapshots(&self, subject: &SubjectId) -> Result<Vec<Snapshot>> {
        let mut snapshots: Vec<Snapshot> = self
            .lock()?
            .snapshots
            .iter()
            .filter(|s| &s.subject_id == subject)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.taken_on);
        Ok(snapshots)
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn append_article(
        &self,
        subject: &SubjectId,
        title: &str,
        markdown: &str,
        html: &str,
    ) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        self.lock()?.articles.push(Article {
            id: id.clone(),
            subject_id: subject.clone(),
            title: title.to_string(),
            markdown: markdown.to_string(),
            html: html.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_articles(&self, subject: &SubjectId) -> Result<Vec<Article>> {
        Ok(self
            .lock()?
            .articles
            .iter()
            .filter(|a| &a.subject_id == subject)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record_llm_call(&self, call: &LlmCall<'_>) -> Result<String> {
        self.lock()?.llm_calls.push(RecordedCall {
            subject: call.subject.cloned(),
            kind: call.kind.to_string(),
            url: call.url.map(str::to_string),
            prompt: call.prompt.map(str::to_string),
            response: call.response.map(str::to_string),
        });
        Ok(Uuid::now_v7().to_string())
    }
}
