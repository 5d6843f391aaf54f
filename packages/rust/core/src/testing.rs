//! Fake collectors, renderers, and stores for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use press_collectors::{FeedSource, IdentitySource, LinkSummarizer};
use press_render::{ArticleRenderer, TemplateRenderer};
use press_shared::{
    Activity, ActivityRecord, Article, BaselinePolicy, FeedEntry, Metadata, PressError, Result,
    Snapshot, SourceId, SourceKind, SourceRef, Subject, SubjectId,
};
use press_storage::{
    ActivityStore, ArticleStore, AuditSink, LlmCall, MemoryStore, PressStore, SnapshotStore,
    SourceRegistry, SubjectStore,
};

use crate::pipeline::{Collectors, PipelineOrchestrator};

pub(crate) fn entry(title: &str, summary: &str, link: Option<&str>) -> FeedEntry {
    FeedEntry {
        title: Some(title.into()),
        link: link.map(Into::into),
        published: Some("2024-05-01T10:00:00+00:00".into()),
        summary: summary.into(),
    }
}

/// Collector fakes backed by fixed data. Unknown feed URLs and broken links fail.
#[derive(Default)]
pub(crate) struct FakeSources {
    pub summary: Option<String>,
    pub feeds: HashMap<String, Vec<FeedEntry>>,
    pub links: HashMap<String, String>,
    pub broken_links: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakeSources {
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_feed(mut self, url: &str, entries: Vec<FeedEntry>) -> Self {
        self.feeds.insert(url.into(), entries);
        self
    }

    pub fn with_link(mut self, url: &str, text: &str) -> Self {
        self.links.insert(url.into(), text.into());
        self
    }

    pub fn with_broken_link(mut self, url: &str) -> Self {
        self.broken_links.insert(url.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentitySource for FakeSources {
    async fn lookup_summary(&self, _name: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.summary.clone())
    }
}

#[async_trait]
impl FeedSource for FakeSources {
    async fn fetch_entries(&self, feed_url: &str) -> Result<Vec<FeedEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.feeds
            .get(feed_url)
            .cloned()
            .ok_or_else(|| PressError::Network(format!("connection refused: {feed_url}")))
    }
}

#[async_trait]
impl LinkSummarizer for FakeSources {
    async fn summarize_link(&self, url: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken_links.contains(url) {
            return Err(PressError::Network(format!("timed out: {url}")));
        }
        Ok(self.links.get(url).cloned())
    }
}

/// Every collector and renderer call fails.
pub(crate) struct Failing;

#[async_trait]
impl IdentitySource for Failing {
    async fn lookup_summary(&self, _name: &str) -> Result<Option<String>> {
        Err(PressError::Network("dns failure".into()))
    }
}

#[async_trait]
impl FeedSource for Failing {
    async fn fetch_entries(&self, _feed_url: &str) -> Result<Vec<FeedEntry>> {
        Err(PressError::parse("malformed feed"))
    }
}

#[async_trait]
impl LinkSummarizer for Failing {
    async fn summarize_link(&self, _url: &str) -> Result<Option<String>> {
        Err(PressError::Summarize("model unavailable".into()))
    }
}

impl ArticleRenderer for Failing {
    fn markdown(&self, _name: &str, _summary: &str, _activities: &[ActivityRecord]) -> Result<String> {
        Err(PressError::Render("template missing".into()))
    }

    fn html(&self, _markdown: &str) -> Result<String> {
        Err(PressError::Render("converter crashed".into()))
    }
}

/// Every store call fails.
pub(crate) struct BrokenStore;

fn broken<T>() -> Result<T> {
    Err(PressError::Storage("database is locked".into()))
}

#[async_trait]
impl SubjectStore for BrokenStore {
    async fn upsert_subject(&self, _: &str, _: Option<&str>, _: &Metadata) -> Result<SubjectId> {
        broken()
    }
    async fn get_subject(&self, _: &str) -> Result<Option<Subject>> {
        broken()
    }
    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        broken()
    }
}

#[async_trait]
impl SourceRegistry for BrokenStore {
    async fn register_source(&self, _: &str, _: SourceKind) -> Result<SourceId> {
        broken()
    }
    async fn get_source(&self, _: &str) -> Result<Option<SourceRef>> {
        broken()
    }
}

#[async_trait]
impl ActivityStore for BrokenStore {
    async fn append_activity(
        &self,
        _: &SubjectId,
        _: &str,
        _: &str,
        _: Option<&SourceId>,
        _: Option<&str>,
    ) -> Result<String> {
        broken()
    }
    async fn list_activities(&self, _: &SubjectId) -> Result<Vec<Activity>> {
        broken()
    }
}

#[async_trait]
impl SnapshotStore for BrokenStore {
    async fn latest_snapshot(&self, _: &SubjectId) -> Result<Option<Snapshot>> {
        broken()
    }
    async fn append_snapshot(&self, _: &SubjectId, _: NaiveDate, _: &str, _: &str) -> Result<String> {
        broken()
    }
    async fn list_snapshots(&self, _: &SubjectId) -> Result<Vec<Snapshot>> {
        broken()
    }
}

#[async_trait]
impl ArticleStore for BrokenStore {
    async fn append_article(&self, _: &SubjectId, _: &str, _: &str, _: &str) -> Result<String> {
        broken()
    }
    async fn list_articles(&self, _: &SubjectId) -> Result<Vec<Article>> {
        broken()
    }
}

#[async_trait]
impl AuditSink for BrokenStore {
    async fn record_llm_call(&self, _: &LlmCall<'_>) -> Result<String> {
        broken()
    }
}

pub(crate) fn collectors_from(sources: &Arc<FakeSources>) -> Collectors {
    Collectors {
        identity: sources.clone(),
        feeds: sources.clone(),
        links: sources.clone(),
    }
}

pub(crate) fn failing_collectors() -> Collectors {
    let failing = Arc::new(Failing);
    Collectors {
        identity: failing.clone(),
        feeds: failing.clone(),
        links: failing,
    }
}

/// Orchestrator over `store` with the built-in template renderer.
pub(crate) fn orchestrator(
    store: Arc<dyn PressStore>,
    collectors: Collectors,
    site_dir: &Path,
    baseline: BaselinePolicy,
) -> PipelineOrchestrator {
    PipelineOrchestrator::new(store, collectors, Arc::new(TemplateRenderer), site_dir)
        .with_baseline(baseline)
}

pub(crate) fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}
