//! Per-subject pipeline: identity → feeds → links → article → output → snapshot.
//!
//! [`PipelineOrchestrator::process`] never fails. Each stage runs on its own,
//! logs its problems, and records a [`StageOutcome`] in the returned
//! [`SubjectReport`], so one failing source or store call cannot stop the
//! remaining stages or other subjects.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, error, info, instrument, warn};

use press_collectors::{FeedSource, IdentitySource, LinkSummarizer};
use press_render::{ArticleRenderer, TEMPLATE_ID, fallback_html, fallback_markdown, slugify};
use press_shared::{
    ActivityRecord, BaselinePolicy, PressError, Result, SourceKind, SubjectDescriptor, SubjectId,
};
use press_storage::{LlmCall, PressStore, record_quietly};

use crate::diff::unified_diff;
use crate::outcome::{Stage, StageOutcome, SubjectReport};
use crate::relevance::is_relevant;

/// Title given to activities produced from summarized links.
pub const LINK_ACTIVITY_TITLE: &str = "Linked page summary";

/// Audit kind recorded for each article render.
pub const ARTICLE_AUDIT_KIND: &str = "article_generation";

/// The external sources the pipeline collects from.
#[derive(Clone)]
pub struct Collectors {
    pub identity: Arc<dyn IdentitySource>,
    pub feeds: Arc<dyn FeedSource>,
    pub links: Arc<dyn LinkSummarizer>,
}

/// Drives subjects through the pipeline against an injected store.
pub struct PipelineOrchestrator {
    store: Arc<dyn PressStore>,
    collectors: Collectors,
    renderer: Arc<dyn ArticleRenderer>,
    site_dir: PathBuf,
    baseline: BaselinePolicy,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<dyn PressStore>,
        collectors: Collectors,
        renderer: Arc<dyn ArticleRenderer>,
        site_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            collectors,
            renderer,
            site_dir: site_dir.into(),
            baseline: BaselinePolicy::default(),
        }
    }

    /// Choose what new snapshots are diffed against.
    pub fn with_baseline(mut self, baseline: BaselinePolicy) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn store(&self) -> &Arc<dyn PressStore> {
        &self.store
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    /// Process one subject. With `network_enabled == false` every collection
    /// stage is skipped and the article is built from stored data.
    #[instrument(skip_all, fields(subject = %descriptor.name, network = network_enabled))]
    pub async fn process(
        &self,
        descriptor: &SubjectDescriptor,
        network_enabled: bool,
    ) -> SubjectReport {
        if let Err(e) = descriptor.validate() {
            warn!(error = %e, "rejecting subject");
            return SubjectReport::rejected(descriptor.name.clone(), e.to_string());
        }

        let name = descriptor.name.trim();
        let mut report = SubjectReport::new(name);
        let mut activities: Vec<ActivityRecord> = Vec::new();

        // --- Stage 1: identity ---
        let (summary, subject_id) = self
            .resolve_identity(descriptor, network_enabled, &mut report)
            .await;
        let subject_id = subject_id.as_ref();

        // --- Stage 2: feeds ---
        let outcome = if network_enabled {
            self.collect_feeds(name, &descriptor.feed_urls, subject_id, &mut activities)
                .await
        } else {
            StageOutcome::Skipped("network disabled".into())
        };
        report.record(Stage::Feeds, outcome);

        // --- Stage 3: links ---
        let outcome = if network_enabled {
            self.summarize_links(&descriptor.link_urls, subject_id, &mut activities)
                .await
        } else {
            StageOutcome::Skipped("network disabled".into())
        };
        report.record(Stage::Links, outcome);

        // Offline articles show what earlier runs stored
        let stored = if network_enabled {
            Vec::new()
        } else {
            self.stored_activities(subject_id).await
        };
        let article_activities = if network_enabled { &activities } else { &stored };

        // --- Stage 4: article ---
        let (markdown, html, outcome) = self.render_article(name, &summary, article_activities);
        report.record(Stage::Article, outcome);
        record_quietly(
            self.store.as_ref(),
            &LlmCall {
                subject: subject_id,
                kind: ARTICLE_AUDIT_KIND,
                url: None,
                prompt: Some(TEMPLATE_ID),
                response: Some(&markdown),
            },
        )
        .await;

        // --- Stage 5: persist article ---
        let outcome = match self.persist_article(subject_id, name, &markdown, &html).await {
            Ok(()) => StageOutcome::Completed,
            Err(e) => {
                warn!(stage = %Stage::PersistArticle, error = %e, "failed to store article");
                StageOutcome::Failed(e.to_string())
            }
        };
        report.record(Stage::PersistArticle, outcome);

        // --- Stage 6: output ---
        let outcome = match self.write_article_file(name, &html).await {
            Ok(path) => {
                info!(path = %path.display(), "wrote article page");
                report.output_path = Some(path);
                StageOutcome::Completed
            }
            Err(e) => {
                warn!(stage = %Stage::Output, error = %e, "failed to write article page");
                StageOutcome::Failed(e.to_string())
            }
        };
        report.record(Stage::Output, outcome);

        // --- Stage 7: snapshot ---
        // Nothing was collected offline, so there is nothing to compare
        let outcome = if !network_enabled {
            StageOutcome::Skipped("network disabled".into())
        } else {
            match self.record_snapshot(subject_id, &activities).await {
                Ok(written) => {
                    report.snapshot_written = written;
                    StageOutcome::Completed
                }
                Err(e) => {
                    warn!(stage = %Stage::Snapshot, error = %e, "snapshot failed");
                    StageOutcome::Failed(e.to_string())
                }
            }
        };
        report.record(Stage::Snapshot, outcome);

        report.activities = activities.len();
        info!(
            activities = report.activities,
            snapshot = report.snapshot_written,
            problems = report.problems().count(),
            "subject processed"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    /// Look up the summary (or reuse the stored one offline) and upsert the
    /// subject. Returns the summary to render and the subject id, if stored.
    async fn resolve_identity(
        &self,
        descriptor: &SubjectDescriptor,
        network_enabled: bool,
        report: &mut SubjectReport,
    ) -> (String, Option<SubjectId>) {
        let name = descriptor.name.trim();

        let (summary, mut outcome) = if network_enabled {
            match self.collectors.identity.lookup_summary(name).await {
                Ok(Some(summary)) => (Some(summary), StageOutcome::Completed),
                Ok(None) => (None, StageOutcome::Degraded("no summary found".into())),
                Err(e) => {
                    warn!(stage = %Stage::Identity, error = %e, "summary lookup failed");
                    (None, StageOutcome::Failed(e.to_string()))
                }
            }
        } else {
            // Offline runs keep the stored summary instead of wiping it
            let stored = match self.store.get_subject(name).await {
                Ok(subject) => subject.and_then(|s| s.summary),
                Err(e) => {
                    warn!(error = %e, "failed to read stored subject");
                    None
                }
            };
            (stored, StageOutcome::Skipped("network disabled".into()))
        };

        let subject_id = match self
            .store
            .upsert_subject(name, summary.as_deref(), &descriptor.metadata)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                error!(error = %e, "subject upsert failed");
                outcome = StageOutcome::Failed(format!("subject upsert failed: {e}"));
                None
            }
        };

        report.record(Stage::Identity, outcome);
        (summary.unwrap_or_default(), subject_id)
    }

    /// Collect relevant entries from every feed. One failing feed never skips
    /// the rest.
    async fn collect_feeds(
        &self,
        name: &str,
        feed_urls: &[String],
        subject: Option<&SubjectId>,
        activities: &mut Vec<ActivityRecord>,
    ) -> StageOutcome {
        if feed_urls.is_empty() {
            return StageOutcome::Skipped("no feeds configured".into());
        }

        let mut problems = Vec::new();
        let mut failed_feeds = 0;
        let mut accepted = 0;

        for feed_url in feed_urls {
            let entries = match self.collectors.feeds.fetch_entries(feed_url).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(url = %feed_url, error = %e, "feed collection failed");
                    problems.push(format!("{feed_url}: {e}"));
                    failed_feeds += 1;
                    continue;
                }
            };

            for entry in entries {
                let title = entry.title.unwrap_or_default();
                if !is_relevant(name, &format!("{title} {}", entry.summary)) {
                    continue;
                }

                let source_url = entry
                    .link
                    .as_deref()
                    .filter(|l| !l.is_empty())
                    .unwrap_or(feed_url);
                if let Err(e) = self
                    .persist_activity(
                        subject,
                        source_url,
                        SourceKind::Feed,
                        &title,
                        &entry.summary,
                        entry.published.as_deref(),
                    )
                    .await
                {
                    warn!(url = %source_url, error = %e, "failed to store feed activity");
                    problems.push(format!("{source_url}: {e}"));
                }

                activities.push(ActivityRecord {
                    title,
                    content: entry.summary,
                    published: entry.published,
                });
                accepted += 1;
            }
        }

        debug!(feeds = feed_urls.len(), accepted, "feeds collected");
        stage_outcome(problems, failed_feeds == feed_urls.len())
    }

    /// Summarize every link. One failing link never skips the rest.
    async fn summarize_links(
        &self,
        link_urls: &[String],
        subject: Option<&SubjectId>,
        activities: &mut Vec<ActivityRecord>,
    ) -> StageOutcome {
        if link_urls.is_empty() {
            return StageOutcome::Skipped("no links configured".into());
        }

        let mut problems = Vec::new();
        let mut failed_links = 0;

        for url in link_urls {
            let text = match self.collectors.links.summarize_link(url).await {
                Ok(Some(text)) if !text.trim().is_empty() => text,
                Ok(_) => {
                    debug!(url = %url, "link produced no summary");
                    continue;
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "link summarization failed");
                    problems.push(format!("{url}: {e}"));
                    failed_links += 1;
                    continue;
                }
            };

            if let Err(e) = self
                .persist_activity(
                    subject,
                    url,
                    SourceKind::PageSummary,
                    LINK_ACTIVITY_TITLE,
                    &text,
                    None,
                )
                .await
            {
                warn!(url = %url, error = %e, "failed to store link activity");
                problems.push(format!("{url}: {e}"));
            }

            activities.push(ActivityRecord {
                title: LINK_ACTIVITY_TITLE.to_string(),
                content: text,
                published: None,
            });
        }

        stage_outcome(problems, failed_links == link_urls.len())
    }

    /// Activities stored by earlier runs, oldest first, with repeats across
    /// runs collapsed. Read failures leave the article without activities.
    async fn stored_activities(&self, subject: Option<&SubjectId>) -> Vec<ActivityRecord> {
        let Some(subject) = subject else {
            return Vec::new();
        };
        let stored = match self.store.list_activities(subject).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "failed to read stored activities");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let records: Vec<ActivityRecord> = stored
            .into_iter()
            .filter(|a| seen.insert((a.title.clone(), a.content.clone())))
            .map(|a| ActivityRecord {
                title: a.title,
                content: a.content,
                published: a.published_at,
            })
            .collect();
        debug!(activities = records.len(), "loaded stored activities");
        records
    }

    /// Render markdown and HTML, substituting fallbacks for renderer failures.
    fn render_article(
        &self,
        name: &str,
        summary: &str,
        activities: &[ActivityRecord],
    ) -> (String, String, StageOutcome) {
        let mut problems = Vec::new();

        let markdown = match self.renderer.markdown(name, summary, activities) {
            Ok(md) => md,
            Err(e) => {
                warn!(stage = %Stage::Article, error = %e, "markdown render failed, using fallback");
                problems.push(format!("markdown: {e}"));
                fallback_markdown(name, summary)
            }
        };

        let html = match self.renderer.html(&markdown) {
            Ok(html) => html,
            Err(e) => {
                warn!(stage = %Stage::Article, error = %e, "HTML render failed, using fallback");
                problems.push(format!("html: {e}"));
                fallback_html(&markdown)
            }
        };

        let outcome = if problems.is_empty() {
            StageOutcome::Completed
        } else {
            StageOutcome::Degraded(problems.join("; "))
        };
        (markdown, html, outcome)
    }

    async fn persist_article(
        &self,
        subject: Option<&SubjectId>,
        name: &str,
        markdown: &str,
        html: &str,
    ) -> Result<()> {
        let subject = require_subject(subject)?;
        self.store
            .append_article(subject, &format!("Article: {name}"), markdown, html)
            .await?;
        Ok(())
    }

    /// Write the page to `<site_dir>/<slug>.html`.
    async fn write_article_file(&self, name: &str, html: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.site_dir)
            .await
            .map_err(|e| PressError::io(&self.site_dir, e))?;

        let path = self.site_dir.join(format!("{}.html", slugify(name)));
        tokio::fs::write(&path, html)
            .await
            .map_err(|e| PressError::io(&path, e))?;
        Ok(path)
    }

    /// Diff this run's activity block against the baseline and store the
    /// result when non-empty. Returns whether a snapshot was written.
    async fn record_snapshot(
        &self,
        subject: Option<&SubjectId>,
        activities: &[ActivityRecord],
    ) -> Result<bool> {
        let subject = require_subject(subject)?;
        let current = activity_block(activities);

        let latest = self.store.latest_snapshot(subject).await?;
        let baseline = match self.baseline {
            BaselinePolicy::PreviousDiff => latest.map(|s| s.diff),
            BaselinePolicy::PreviousContent => latest.map(|s| s.content),
        }
        .unwrap_or_default();

        let diff = unified_diff(&baseline, &current);
        if diff.is_empty() {
            debug!("no changes since last snapshot");
            return Ok(false);
        }

        self.store
            .append_snapshot(subject, Local::now().date_naive(), &diff.join("\n"), &current)
            .await?;
        debug!(lines = diff.len(), "snapshot stored");
        Ok(true)
    }

    async fn persist_activity(
        &self,
        subject: Option<&SubjectId>,
        source_url: &str,
        kind: SourceKind,
        title: &str,
        content: &str,
        published_at: Option<&str>,
    ) -> Result<()> {
        let subject = require_subject(subject)?;
        let source = self.store.register_source(source_url, kind).await?;
        self.store
            .append_activity(subject, title, content, Some(&source), published_at)
            .await?;
        Ok(())
    }
}

/// Concatenate each activity's title and content, one per line, in order.
pub fn activity_block(activities: &[ActivityRecord]) -> String {
    activities
        .iter()
        .map(|a| format!("{}\n{}", a.title, a.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn require_subject(subject: Option<&SubjectId>) -> Result<&SubjectId> {
    subject.ok_or_else(|| PressError::Storage("subject was not stored".into()))
}

/// Outcome of a multi-source stage from its problems.
fn stage_outcome(problems: Vec<String>, all_sources_failed: bool) -> StageOutcome {
    if problems.is_empty() {
        StageOutcome::Completed
    } else if all_sources_failed {
        StageOutcome::Failed(problems.join("; "))
    } else {
        StageOutcome::Degraded(problems.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use press_shared::{Metadata, SourceKind};
    use press_storage::{ActivityStore, ArticleStore, SnapshotStore, SourceRegistry, SubjectStore};

    use crate::testing::*;

    const FEED: &str = "https://news.example.com/feed.xml";
    const AWARD: &str = "https://news.example.com/ada-award";

    fn ada() -> SubjectDescriptor {
        SubjectDescriptor {
            feed_urls: vec![FEED.into()],
            ..SubjectDescriptor::named("Ada Lovelace")
        }
    }

    fn ada_sources() -> Arc<FakeSources> {
        Arc::new(
            FakeSources::default()
                .with_summary("English mathematician.")
                .with_feed(
                    FEED,
                    vec![
                        entry("Ada Lovelace receives award", "local celebration", Some(AWARD)),
                        entry("Council meeting", "budget talks", None),
                    ],
                ),
        )
    }

    #[tokio::test]
    async fn ada_lovelace_end_to_end() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let orch = orchestrator(
            store.clone(),
            collectors_from(&ada_sources()),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        let report = orch.process(&ada(), true).await;
        assert!(report.rejected.is_none());
        assert_eq!(report.problems().count(), 0, "{:?}", report.stages);
        assert_eq!(report.activities, 1);
        assert!(report.snapshot_written);

        let subject = store.get_subject("Ada Lovelace").await.unwrap().unwrap();
        assert_eq!(subject.summary.as_deref(), Some("English mathematician."));

        let activities = store.list_activities(&subject.id).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].title, "Ada Lovelace receives award");

        assert_eq!(store.source_count(), 1);
        let source = store.get_source(AWARD).await.unwrap().unwrap();
        assert_eq!(source.kind, SourceKind::Feed);
        assert_eq!(activities[0].source_id.as_ref(), Some(&source.id));

        let articles = store.list_articles(&subject.id).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Article: Ada Lovelace");
        assert!(articles[0].markdown.contains("Ada Lovelace"));
        assert!(articles[0].markdown.contains("Ada Lovelace receives award"));

        let page = site.path().join("Ada_Lovelace.html");
        assert_eq!(report.output_path.as_deref(), Some(page.as_path()));
        let html = std::fs::read_to_string(&page).unwrap();
        assert!(html.contains("Ada Lovelace receives award"));

        let calls = store.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, ARTICLE_AUDIT_KIND);
        assert_eq!(calls[0].subject.as_ref(), Some(&subject.id));
        assert_eq!(calls[0].prompt.as_deref(), Some(TEMPLATE_ID));
    }

    #[tokio::test]
    async fn every_collector_failing_still_produces_output() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let orch = PipelineOrchestrator::new(
            store.clone(),
            failing_collectors(),
            Arc::new(Failing),
            site.path(),
        );
        let descriptor = SubjectDescriptor {
            feed_urls: vec![FEED.into(), "https://other.example.com/rss".into()],
            link_urls: vec!["https://x.example.com/jane/status/1".into()],
            ..SubjectDescriptor::named("Jane Doe")
        };

        let report = orch.process(&descriptor, true).await;

        assert!(report.outcome(Stage::Identity).unwrap().is_failed());
        assert!(report.outcome(Stage::Feeds).unwrap().is_failed());
        assert!(report.outcome(Stage::Links).unwrap().is_failed());
        assert!(report.outcome(Stage::Article).unwrap().is_degraded());
        assert!(report.outcome(Stage::PersistArticle).unwrap().is_completed());
        assert!(report.outcome(Stage::Output).unwrap().is_completed());
        assert!(report.outcome(Stage::Snapshot).unwrap().is_completed());
        assert_eq!(report.activities, 0);

        let html = std::fs::read_to_string(site.path().join("Jane_Doe.html")).unwrap();
        assert_eq!(html, "<html><body><pre># Jane Doe\n\n</pre></body></html>");

        let subject = store.get_subject("Jane Doe").await.unwrap().unwrap();
        assert_eq!(subject.summary, None);
    }

    #[tokio::test]
    async fn broken_store_still_writes_page() {
        let site = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            Arc::new(BrokenStore),
            collectors_from(&ada_sources()),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        let report = orch.process(&ada(), true).await;

        assert!(report.outcome(Stage::Identity).unwrap().is_failed());
        assert!(report.outcome(Stage::Feeds).unwrap().is_degraded());
        assert!(report.outcome(Stage::PersistArticle).unwrap().is_failed());
        assert!(report.outcome(Stage::Snapshot).unwrap().is_failed());
        assert!(report.outcome(Stage::Output).unwrap().is_completed());
        // Collected activities still reach the article
        assert_eq!(report.activities, 1);
        let html = std::fs::read_to_string(site.path().join("Ada_Lovelace.html")).unwrap();
        assert!(html.contains("Ada Lovelace receives award"));
    }

    #[tokio::test]
    async fn offline_without_prior_summary_renders_only_name() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let sources = ada_sources();
        let orch = orchestrator(
            store.clone(),
            collectors_from(&sources),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        let report = orch.process(&ada(), false).await;

        assert_eq!(sources.calls(), 0);
        assert!(matches!(report.outcome(Stage::Identity), Some(StageOutcome::Skipped(_))));
        assert!(matches!(report.outcome(Stage::Feeds), Some(StageOutcome::Skipped(_))));
        assert!(matches!(report.outcome(Stage::Links), Some(StageOutcome::Skipped(_))));

        let subject = store.get_subject("Ada Lovelace").await.unwrap().unwrap();
        assert_eq!(subject.summary, None);
        assert!(store.list_activities(&subject.id).await.unwrap().is_empty());

        let articles = store.list_articles(&subject.id).await.unwrap();
        assert_eq!(articles[0].markdown, "# Ada Lovelace\n");
        assert!(!report.snapshot_written);
    }

    #[tokio::test]
    async fn offline_keeps_stored_summary() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        store
            .upsert_subject("Ada Lovelace", Some("Stored summary."), &Metadata::new())
            .await
            .unwrap();
        let orch = orchestrator(
            store.clone(),
            collectors_from(&ada_sources()),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        orch.process(&ada(), false).await;

        let subject = store.get_subject("Ada Lovelace").await.unwrap().unwrap();
        assert_eq!(subject.summary.as_deref(), Some("Stored summary."));
        let articles = store.list_articles(&subject.id).await.unwrap();
        assert!(articles[0].markdown.contains("Stored summary."));
    }

    #[tokio::test]
    async fn bad_feed_does_not_skip_the_rest() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let descriptor = SubjectDescriptor {
            feed_urls: vec!["https://down.example.com/rss".into(), FEED.into()],
            ..SubjectDescriptor::named("Ada Lovelace")
        };
        let orch = orchestrator(
            store.clone(),
            collectors_from(&ada_sources()),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        let report = orch.process(&descriptor, true).await;

        assert!(report.outcome(Stage::Feeds).unwrap().is_degraded());
        assert_eq!(report.activities, 1);
    }

    #[tokio::test]
    async fn entry_without_link_registers_feed_url() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let sources = Arc::new(
            FakeSources::default().with_feed(FEED, vec![entry("Note", "ada lovelace spoke", None)]),
        );
        let orch = orchestrator(
            store.clone(),
            collectors_from(&sources),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        orch.process(&ada(), true).await;

        let source = store.get_source(FEED).await.unwrap().unwrap();
        assert_eq!(source.kind, SourceKind::Feed);
    }

    #[tokio::test]
    async fn link_summaries_become_activities() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let link = "https://x.example.com/ada/status/1";
        let sources = Arc::new(
            FakeSources::default()
                .with_link(link, &format!("Source: {link}\n\nAda posted a note."))
                .with_link("https://x.example.com/ada/status/2", "   "),
        );
        let descriptor = SubjectDescriptor {
            link_urls: vec![
                link.into(),
                "https://x.example.com/ada/status/2".into(),
                "https://x.example.com/ada/status/3".into(),
            ],
            ..SubjectDescriptor::named("Ada Lovelace")
        };
        let orch = orchestrator(
            store.clone(),
            collectors_from(&sources),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        let report = orch.process(&descriptor, true).await;

        assert!(report.outcome(Stage::Links).unwrap().is_completed());
        assert_eq!(report.activities, 1);
        assert_eq!(store.source_count(), 1);
        let source = store.get_source(link).await.unwrap().unwrap();
        assert_eq!(source.kind, SourceKind::PageSummary);

        let subject = store.get_subject("Ada Lovelace").await.unwrap().unwrap();
        let activities = store.list_activities(&subject.id).await.unwrap();
        assert_eq!(activities[0].title, LINK_ACTIVITY_TITLE);
        assert!(activities[0].content.starts_with("Source: "));
    }

    #[tokio::test]
    async fn bad_link_does_not_skip_the_rest() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let down = "https://x.example.com/ada/status/1";
        let up = "https://x.example.com/ada/status/2";
        let sources = Arc::new(
            FakeSources::default()
                .with_broken_link(down)
                .with_link(up, &format!("Source: {up}\n\nAda replied.")),
        );
        let descriptor = SubjectDescriptor {
            link_urls: vec![down.into(), up.into()],
            ..SubjectDescriptor::named("Ada Lovelace")
        };
        let orch = orchestrator(
            store.clone(),
            collectors_from(&sources),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        let report = orch.process(&descriptor, true).await;

        match report.outcome(Stage::Links) {
            Some(StageOutcome::Degraded(reason)) => assert!(reason.contains(down)),
            other => panic!("expected degraded links stage, got {other:?}"),
        }
        assert_eq!(report.activities, 1);
        assert!(store.get_source(down).await.unwrap().is_none());
        assert!(store.get_source(up).await.unwrap().is_some());

        let html = std::fs::read_to_string(site.path().join("Ada_Lovelace.html")).unwrap();
        assert!(html.contains("Ada replied."));
    }

    #[tokio::test]
    async fn offline_run_renders_stored_activities_without_snapshot() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let orch = orchestrator(
            store.clone(),
            collectors_from(&ada_sources()),
            site.path(),
            BaselinePolicy::PreviousContent,
        );

        orch.process(&ada(), true).await;
        orch.process(&ada(), true).await;
        let offline = orch.process(&ada(), false).await;

        assert!(matches!(
            offline.outcome(Stage::Snapshot),
            Some(StageOutcome::Skipped(_))
        ));
        assert!(!offline.snapshot_written);
        assert_eq!(offline.activities, 0);

        let subject = store.get_subject("Ada Lovelace").await.unwrap().unwrap();
        assert_eq!(store.list_snapshots(&subject.id).await.unwrap().len(), 1);
        assert_eq!(store.list_activities(&subject.id).await.unwrap().len(), 2);

        let articles = store.list_articles(&subject.id).await.unwrap();
        let markdown = &articles.last().unwrap().markdown;
        assert!(markdown.contains("English mathematician."));
        // Repeats stored by the two online runs appear once
        assert_eq!(markdown.matches("Ada Lovelace receives award").count(), 1);
        assert!(markdown.contains("local celebration"));
    }

    #[tokio::test]
    async fn identical_content_twice_writes_one_snapshot() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let orch = orchestrator(
            store.clone(),
            collectors_from(&ada_sources()),
            site.path(),
            BaselinePolicy::PreviousContent,
        );

        let first = orch.process(&ada(), true).await;
        let second = orch.process(&ada(), true).await;
        assert!(first.snapshot_written);
        assert!(!second.snapshot_written);

        let subject = store.get_subject("Ada Lovelace").await.unwrap().unwrap();
        let snapshots = store.list_snapshots(&subject.id).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(
            snapshots[0].diff,
            "--- old\n+++ new\n@@ -0,0 +1,2 @@\n+Ada Lovelace receives award\n+local celebration"
        );
        assert_eq!(
            snapshots[0].content,
            "Ada Lovelace receives award\nlocal celebration"
        );

        // Activities are append-only across runs
        assert_eq!(store.list_activities(&subject.id).await.unwrap().len(), 2);
        assert_eq!(store.list_articles(&subject.id).await.unwrap().len(), 2);
        assert_eq!(store.source_count(), 1);
    }

    #[tokio::test]
    async fn previous_diff_baseline_compares_against_stored_diff() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let orch = orchestrator(
            store.clone(),
            collectors_from(&ada_sources()),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        orch.process(&ada(), true).await;
        let second = orch.process(&ada(), true).await;
        assert!(second.snapshot_written);

        let subject = store.get_subject("Ada Lovelace").await.unwrap().unwrap();
        let snapshots = store.list_snapshots(&subject.id).await.unwrap();
        assert_eq!(snapshots.len(), 2);
        let lines: Vec<&str> = snapshots[1].diff.lines().collect();
        assert!(lines.contains(&"-+Ada Lovelace receives award"));
        assert!(lines.contains(&"+Ada Lovelace receives award"));
    }

    #[tokio::test]
    async fn no_activities_never_snapshots() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let orch = orchestrator(
            store.clone(),
            collectors_from(&Arc::new(FakeSources::default())),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        for _ in 0..2 {
            let report = orch.process(&SubjectDescriptor::named("Jane Doe"), true).await;
            assert!(!report.snapshot_written);
        }
        let subject = store.get_subject("Jane Doe").await.unwrap().unwrap();
        assert!(store.list_snapshots(&subject.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let site = tempfile::tempdir().unwrap();
        let store = memory_store();
        let orch = orchestrator(
            store.clone(),
            collectors_from(&ada_sources()),
            site.path(),
            BaselinePolicy::PreviousDiff,
        );

        let report = orch.process(&SubjectDescriptor::named("  "), true).await;
        assert!(report.rejected.is_some());
        assert!(report.stages.is_empty());
        assert!(store.list_subjects().await.unwrap().is_empty());
    }

    #[test]
    fn activity_block_joins_in_order() {
        let block = activity_block(&[
            ActivityRecord {
                title: "A".into(),
                content: "first".into(),
                published: None,
            },
            ActivityRecord {
                title: "B".into(),
                content: "second".into(),
                published: None,
            },
        ]);
        assert_eq!(block, "A\nfirst\nB\nsecond");
        assert_eq!(activity_block(&[]), "");
    }
}
