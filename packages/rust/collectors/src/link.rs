//! Link summarization: fetch a page, condense it, fall back to an excerpt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use press_shared::{LlmConfig, Result};
use press_storage::{AuditSink, LlmCall, record_quietly};

use crate::page::PageFetcher;
use crate::text::truncate_chars;
use crate::{LinkSummarizer, TextSummarizer};

/// Audit kind recorded for every link summary.
pub const AUDIT_KIND: &str = "page_summary";

/// Instructions sent with every page.
pub const DEFAULT_PROMPT: &str = "You are a concise, factual summarizer. Given the text of a page \
linked from a social media post, write a short factual summary (at most 200 words) covering \
statements, events and dates. Include quotes and named people when present. Do not invent facts.";

/// Characters of page text sent to the model.
const PROMPT_TEXT_LIMIT: usize = 20_000;
/// Lines and characters kept in the fallback excerpt.
const EXCERPT_LINES: usize = 10;
const EXCERPT_CHARS: usize = 2_000;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

/// [`LinkSummarizer`] backed by a page fetcher and a [`TextSummarizer`].
pub struct PageSummarizer {
    fetcher: PageFetcher,
    summarizer: Arc<dyn TextSummarizer>,
    audit: Arc<dyn AuditSink>,
    retry: RetryPolicy,
    prompt: String,
}

impl PageSummarizer {
    pub fn new(
        fetcher: PageFetcher,
        summarizer: Arc<dyn TextSummarizer>,
        audit: Arc<dyn AuditSink>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            summarizer,
            audit,
            retry,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Override the instructions sent to the model.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Run the summarizer up to `max_attempts` times.
    async fn summarize_with_retry(&self, url: &str, user_content: &str) -> Option<String> {
        for attempt in 1..=self.retry.max_attempts {
            info!(attempt, "LLM attempt");
            match self.summarizer.summarize(&self.prompt, user_content).await {
                Ok(Some(summary)) => return Some(summary),
                Ok(None) => warn!(attempt, "LLM attempt produced nothing"),
                Err(e) => warn!(attempt, error = %e, "LLM attempt failed"),
            }
            if attempt < self.retry.max_attempts {
                tokio::time::sleep(self.retry.delay_after(attempt)).await;
            }
        }
        warn!(url, "all LLM attempts failed, using fallback excerpt");
        None
    }
}

#[async_trait]
impl LinkSummarizer for PageSummarizer {
    #[instrument(skip(self))]
    async fn summarize_link(&self, url: &str) -> Result<Option<String>> {
        let Some(page_text) = self.fetcher.fetch_text(url).await? else {
            info!("no page text available");
            return Ok(None);
        };

        let user_content = format!(
            "URL: {url}\n\nContent:\n{}",
            truncate_chars(&page_text, PROMPT_TEXT_LIMIT)
        );

        let result = match self.summarize_with_retry(url, &user_content).await {
            Some(summary) => format!("Source: {url}\n\n{summary}"),
            None => format!("Source: {url}\n\n(FALLBACK) {}", fallback_excerpt(&page_text)),
        };

        record_quietly(
            self.audit.as_ref(),
            &LlmCall {
                subject: None,
                kind: AUDIT_KIND,
                url: Some(url),
                prompt: Some(&self.prompt),
                response: Some(&result),
            },
        )
        .await;

        Ok(Some(result))
    }
}

/// First lines of the page text, capped in length.
fn fallback_excerpt(page_text: &str) -> String {
    let excerpt = page_text
        .lines()
        .take(EXCERPT_LINES)
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&excerpt, EXCERPT_CHARS).to_string()
}
