//! Shared types, error model, and configuration for press.
//!
//! This crate is the foundation depended on by all other press crates.
//! It provides:
//! - [`PressError`] — the unified error type
//! - Domain types ([`Subject`], [`SubjectDescriptor`], [`FeedEntry`], [`SourceKind`])
//! - Configuration ([`AppConfig`], config and subject-list loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BaselinePolicy, CollectorsConfig, DefaultsConfig, LlmConfig, SnapshotConfig,
    api_key, config_dir, config_file_path, init_config, load_config, load_config_from,
    load_subjects, load_subjects_from,
};
pub use error::{PressError, Result};
pub use types::{
    Activity, ActivityRecord, Article, FeedEntry, Metadata, Snapshot, SourceId, SourceKind, SourceRef,
    Subject, SubjectDescriptor, SubjectId,
};
