//! Core domain types for press subjects, sources, and activities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PressError, Result};

/// Open key/value map attached to a subject.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for subject identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub Uuid);

impl SubjectId {
    /// Generate a new time-sortable subject identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SubjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Stable reference to a registered source URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SourceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// What kind of origin a source URL is. Fixed at first registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Feed,
    Encyclopedia,
    PageSummary,
}

impl SourceKind {
    /// Storage tag for the `sources.kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Encyclopedia => "encyclopedia",
            Self::PageSummary => "page-summary",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = PressError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "feed" => Ok(Self::Feed),
            "encyclopedia" => Ok(Self::Encyclopedia),
            "page-summary" => Ok(Self::PageSummary),
            other => Err(PressError::parse(format!("unknown source kind '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Subject
// ---------------------------------------------------------------------------

/// A tracked subject as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    /// Unique human identity.
    pub name: String,
    /// Latest encyclopedia summary, if any was ever obtained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input description of one subject to process.
///
/// Missing `feed_urls` / `link_urls` are treated as empty lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectDescriptor {
    pub name: String,
    /// Syndication feeds to scan for relevant entries.
    #[serde(default, alias = "rss")]
    pub feed_urls: Vec<String>,
    /// Social-media links whose target pages get summarized.
    #[serde(default, alias = "x_urls")]
    pub link_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: Metadata,
}

impl SubjectDescriptor {
    /// Descriptor with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Reject descriptors that cannot be processed at all.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PressError::validation("subject name is blank"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collected items
// ---------------------------------------------------------------------------

/// One normalized entry from a syndication feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// Publication timestamp as RFC 3339 text, when the feed carries one.
    pub published: Option<String>,
    /// Plain-text summary (HTML already stripped).
    pub summary: String,
}

/// An activity accumulated during the current run (in collection order).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

// ---------------------------------------------------------------------------
// Stored rows
// ---------------------------------------------------------------------------

/// A persisted activity row. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub subject_id: SubjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<SourceId>,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A registered source URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: SourceId,
    pub url: String,
    pub kind: SourceKind,
}

/// A persisted snapshot: what changed for a subject on a given run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub subject_id: SubjectId,
    pub taken_on: NaiveDate,
    /// Unified diff text against the baseline in force when it was taken.
    pub diff: String,
    /// The activity block the diff was computed from.
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A rendered article. One row is appended per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub subject_id: SubjectId,
    pub title: String,
    pub markdown: String,
    pub html: String,
    pub created_at: DateTime<Utc>,
}
