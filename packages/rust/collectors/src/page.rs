//! Fetch a web page and extract its visible text.

use reqwest::{Client, StatusCode};
use tracing::{instrument, warn};

use press_shared::{PressError, Result};

use crate::text::page_text;

/// Downloads pages and reduces them to plain text.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    text_limit: usize,
}

impl PageFetcher {
    pub fn new(client: Client, text_limit: usize) -> Self {
        Self { client, text_limit }
    }

    /// Visible text of the page at `url`.
    ///
    /// Returns `Ok(None)` for non-200 responses and for pages with no text.
    #[instrument(skip(self))]
    pub async fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PressError::Network(format!("page fetch failed: {e}")))?;

        if resp.status() != StatusCode::OK {
            warn!(status = %resp.status(), "page fetch returned non-200");
            return Ok(None);
        }

        let html = resp
            .text()
            .await
            .map_err(|e| PressError::Network(format!("failed to read page body: {e}")))?;

        let text = page_text(&html, self.text_limit);
        Ok((!text.is_empty()).then_some(text))
    }
}
