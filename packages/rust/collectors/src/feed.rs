//! RSS/Atom/JSON feed collector.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use press_shared::{FeedEntry, PressError, Result};

use crate::FeedSource;
use crate::text::clean_html_to_text;

/// Fetches a feed over HTTP and normalizes its entries.
pub struct FeedCollector {
    client: Client,
}

impl FeedCollector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for FeedCollector {
    #[instrument(skip_all, fields(url = %feed_url))]
    async fn fetch_entries(&self, feed_url: &str) -> Result<Vec<FeedEntry>> {
        let resp = self
            .client
            .get(feed_url)
            .send()
            .await
            .map_err(|e| PressError::Network(format!("feed fetch failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PressError::Network(format!("feed returned HTTP {status}")));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| PressError::Network(format!("failed to read feed body: {e}")))?;

        let entries = parse_feed(&bytes)?;
        debug!(entries = entries.len(), "feed parsed");
        Ok(entries)
    }
}

/// Parse raw feed bytes into normalized entries.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| PressError::parse(format!("invalid feed: {e}")))?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let summary_html = entry
                .summary
                .map(|t| t.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            FeedEntry {
                title: entry.title.map(|t| t.content),
                link: entry.links.first().map(|l| l.href.clone()),
                published: entry.published.or(entry.updated).map(|dt| dt.to_rfc3339()),
                summary: clean_html_to_text(&summary_html),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Local News</title>
    <link>https://news.example.com</link>
    <description>News</description>
    <item>
      <title>Ada Lovelace receives award</title>
      <link>https://news.example.com/ada-award</link>
      <pubDate>Wed, 01 May 2024 10:00:00 GMT</pubDate>
      <description>&lt;p&gt;local celebration&lt;/p&gt;</description>
    </item>
    <item>
      <title>Council meeting</title>
      <description>budget talks</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_rss_entries() {
        let entries = parse_feed(RSS.as_bytes()).expect("parse");
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.title.as_deref(), Some("Ada Lovelace receives award"));
        assert_eq!(first.link.as_deref(), Some("https://news.example.com/ada-award"));
        assert_eq!(first.summary, "local celebration");
        assert!(first.published.as_deref().unwrap().starts_with("2024-05-01T10:00:00"));

        assert_eq!(entries[1].link, None);
        assert_eq!(entries[1].published, None);
    }

    #[test]
    fn escaped_entities_in_description_are_decoded() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>News</title><link>https://news.example.com</link>
<description>News</description>
<item><title>Prize</title>
<description>&lt;p&gt;Ada&amp;nbsp;Lovelace &amp;amp; Babbage&lt;/p&gt;</description></item>
</channel></rss>"#;
        let entries = parse_feed(rss.as_bytes()).expect("parse");
        assert_eq!(entries[0].summary, "Ada Lovelace & Babbage");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_feed(b"not a feed").unwrap_err();
        assert!(matches!(err, PressError::Parse { .. }));
    }

    #[tokio::test]
    async fn fetches_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .mount(&server)
            .await;

        let collector = FeedCollector::new(Client::new());
        let entries = collector
            .fetch_entries(&format!("{}/feed.xml", server.uri()))
            .await
            .expect("fetch");
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let collector = FeedCollector::new(Client::new());
        let result = collector
            .fetch_entries(&format!("{}/feed.xml", server.uri()))
            .await;
        assert!(matches!(result, Err(PressError::Network(_))));
    }
}
