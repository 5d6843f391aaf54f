//! Per-stage results for one subject's pipeline run.

use std::fmt;
use std::path::PathBuf;

/// The fixed stages of the per-subject pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Identity,
    Feeds,
    Links,
    Article,
    PersistArticle,
    Output,
    Snapshot,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Feeds => "feeds",
            Self::Links => "links",
            Self::Article => "article",
            Self::PersistArticle => "persist-article",
            Self::Output => "output",
            Self::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// Not attempted (e.g. network disabled, nothing configured).
    Skipped(String),
    /// Produced output, but only partially or via a fallback.
    Degraded(String),
    /// Produced nothing.
    Failed(String),
}

impl StageOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Degraded(reason) => write!(f, "degraded ({reason})"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Everything that happened while processing one subject.
#[derive(Debug, Clone, Default)]
pub struct SubjectReport {
    pub subject: String,
    /// Set when the descriptor could not be processed at all.
    pub rejected: Option<String>,
    pub stages: Vec<(Stage, StageOutcome)>,
    /// Activities accumulated during this run.
    pub activities: usize,
    pub snapshot_written: bool,
    /// Where the article page was written.
    pub output_path: Option<PathBuf>,
}

impl SubjectReport {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Default::default()
        }
    }

    pub fn rejected(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            rejected: Some(reason.into()),
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push((stage, outcome));
    }

    /// Outcome of `stage`, if it ran.
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, outcome)| outcome)
    }

    /// Stages that did not complete cleanly (degraded or failed).
    pub fn problems(&self) -> impl Iterator<Item = &(Stage, StageOutcome)> {
        self.stages
            .iter()
            .filter(|(_, o)| o.is_degraded() || o.is_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_lookup_and_problems() {
        let mut report = SubjectReport::new("Jane Doe");
        report.record(Stage::Identity, StageOutcome::Completed);
        report.record(Stage::Feeds, StageOutcome::Failed("timeout".into()));
        report.record(Stage::Links, StageOutcome::Skipped("none configured".into()));

        assert_eq!(report.outcome(Stage::Identity), Some(&StageOutcome::Completed));
        assert_eq!(report.outcome(Stage::Snapshot), None);
        let problems: Vec<Stage> = report.problems().map(|(s, _)| *s).collect();
        assert_eq!(problems, vec![Stage::Feeds]);
    }

    #[test]
    fn display() {
        assert_eq!(Stage::PersistArticle.to_string(), "persist-article");
        assert_eq!(
            StageOutcome::Degraded("fallback html".into()).to_string(),
            "degraded (fallback html)"
        );
    }
}
