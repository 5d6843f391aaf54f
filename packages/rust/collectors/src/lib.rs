//! Source collectors for press.
//!
//! This crate provides:
//! - [`FeedCollector`]: RSS/Atom/JSON feed entries via `feed-rs`
//! - [`EncyclopediaCollector`]: short subject summaries from a REST summary endpoint
//! - [`PageFetcher`]: visible text of an arbitrary web page
//! - [`OpenAiSummarizer`]: the [`TextSummarizer`] capability over a chat-completions API
//! - [`PageSummarizer`]: link summarization with bounded retry and an excerpt fallback
//!
//! The pipeline only sees the traits below, so every collector can be swapped
//! for a fake in tests.

pub mod encyclopedia;
pub mod feed;
pub mod link;
pub mod page;
pub mod summarizer;
pub mod text;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use press_shared::{CollectorsConfig, FeedEntry, PressError, Result};

pub use encyclopedia::EncyclopediaCollector;
pub use feed::FeedCollector;
pub use link::{PageSummarizer, RetryPolicy};
pub use page::PageFetcher;
pub use summarizer::OpenAiSummarizer;

// ---------------------------------------------------------------------------
// Collector contracts
// ---------------------------------------------------------------------------

/// Fetches entries from one syndication feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Entries in feed order. Errors cover one feed only.
    async fn fetch_entries(&self, feed_url: &str) -> Result<Vec<FeedEntry>>;
}

/// Looks up a short identity summary for a subject name.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn lookup_summary(&self, name: &str) -> Result<Option<String>>;
}

/// Generative text capability: condense `text` following `prompt`.
///
/// `Ok(None)` means the capability is unavailable (e.g. no API key) or the
/// model produced nothing.
#[async_trait]
pub trait TextSummarizer: Send + Sync {
    async fn summarize(&self, prompt: &str, text: &str) -> Result<Option<String>>;
}

/// Summarizes the page behind an arbitrary URL.
#[async_trait]
pub trait LinkSummarizer: Send + Sync {
    /// A text block prefixed with `Source: <url>`, or `None` when the page
    /// yielded no text.
    async fn summarize_link(&self, url: &str) -> Result<Option<String>>;
}

/// Build the HTTP client shared by the collectors.
pub fn http_client(config: &CollectorsConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| PressError::Network(format!("failed to build HTTP client: {e}")))
}
