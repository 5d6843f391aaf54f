//! Aggregation-and-snapshot pipeline for press.
//!
//! This crate ties the collectors, the store, and the renderer together:
//! - [`relevance`]: which feed entries belong to a subject
//! - [`diff`]: unified line diffs between runs
//! - [`pipeline`]: the per-subject [`PipelineOrchestrator`]
//! - [`run`]: the run loop over all subjects and the site index

pub mod diff;
pub mod outcome;
pub mod pipeline;
pub mod relevance;
pub mod run;

#[cfg(test)]
mod testing;

pub use diff::unified_diff;
pub use outcome::{Stage, StageOutcome, SubjectReport};
pub use pipeline::{Collectors, PipelineOrchestrator, activity_block};
pub use relevance::is_relevant;
pub use run::{ProgressReporter, RunSummary, SilentProgress, run_all, write_index};
