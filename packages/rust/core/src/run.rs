//! Run loop over all subjects plus the site index.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use press_render::render_index;
use press_shared::{PressError, Result, SubjectDescriptor};
use press_storage::SubjectStore;

use crate::outcome::SubjectReport;
use crate::pipeline::PipelineOrchestrator;

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a subject is processed (`current` is 1-based).
    fn subject_started(&self, name: &str, current: usize, total: usize);
    /// Called after a subject is processed.
    fn subject_finished(&self, report: &SubjectReport);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn subject_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn subject_finished(&self, _report: &SubjectReport) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Totals for one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<SubjectReport>,
    /// Written index page, if the index could be built.
    pub index_path: Option<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn subjects(&self) -> usize {
        self.reports.len()
    }

    pub fn rejected(&self) -> usize {
        self.reports.iter().filter(|r| r.rejected.is_some()).count()
    }

    pub fn activities(&self) -> usize {
        self.reports.iter().map(|r| r.activities).sum()
    }

    pub fn snapshots(&self) -> usize {
        self.reports.iter().filter(|r| r.snapshot_written).count()
    }

    /// Degraded or failed stages across all subjects.
    pub fn problems(&self) -> usize {
        self.reports.iter().map(|r| r.problems().count()).sum()
    }
}

/// Process every subject in order, then rebuild the index page.
///
/// Subjects never affect each other: a rejected or failing subject is
/// reported and the run moves on.
#[instrument(skip_all, fields(subjects = descriptors.len(), network = network_enabled))]
pub async fn run_all(
    orchestrator: &PipelineOrchestrator,
    descriptors: &[SubjectDescriptor],
    network_enabled: bool,
    progress: &dyn ProgressReporter,
) -> RunSummary {
    let start = Instant::now();
    let mut summary = RunSummary::default();

    for (i, descriptor) in descriptors.iter().enumerate() {
        progress.subject_started(&descriptor.name, i + 1, descriptors.len());
        let report = orchestrator.process(descriptor, network_enabled).await;
        progress.subject_finished(&report);
        summary.reports.push(report);
    }

    match write_index(orchestrator.store().as_ref(), orchestrator.site_dir()).await {
        Ok(path) => summary.index_path = Some(path),
        Err(e) => warn!(error = %e, "failed to write index page"),
    }

    summary.elapsed = start.elapsed();
    info!(
        subjects = summary.subjects(),
        activities = summary.activities(),
        snapshots = summary.snapshots(),
        problems = summary.problems(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run complete"
    );
    progress.done(&summary);
    summary
}

/// Write `<site_dir>/index.html` listing every stored subject.
pub async fn write_index<S>(store: &S, site_dir: &Path) -> Result<PathBuf>
where
    S: SubjectStore + ?Sized,
{
    let subjects = store.list_subjects().await?;

    tokio::fs::create_dir_all(site_dir)
        .await
        .map_err(|e| PressError::io(site_dir, e))?;
    let path = site_dir.join("index.html");
    tokio::fs::write(&path, render_index(&subjects))
        .await
        .map_err(|e| PressError::io(&path, e))?;

    info!(subjects = subjects.len(), path = %path.display(), "wrote index page");
    Ok(path)
}
