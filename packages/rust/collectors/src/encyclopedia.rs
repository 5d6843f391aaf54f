//! Encyclopedia summary lookup (Wikipedia REST `page/summary` shape).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use press_shared::{PressError, Result};

use crate::IdentitySource;

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    extract: Option<String>,
}

/// Looks up `<endpoint><Name_With_Underscores>` and returns its `extract`.
pub struct EncyclopediaCollector {
    client: Client,
    endpoint: String,
}

impl EncyclopediaCollector {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn lookup_url(&self, name: &str) -> String {
        format!("{}{}", self.endpoint, name.trim().replace(' ', "_"))
    }
}

#[async_trait]
impl IdentitySource for EncyclopediaCollector {
    #[instrument(skip_all, fields(subject = %name))]
    async fn lookup_summary(&self, name: &str) -> Result<Option<String>> {
        let url = self.lookup_url(name);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PressError::Network(format!("encyclopedia request failed: {e}")))?;

        if resp.status() != StatusCode::OK {
            debug!(status = %resp.status(), "no encyclopedia entry");
            return Ok(None);
        }

        let body: SummaryResponse = resp
            .json()
            .await
            .map_err(|e| PressError::parse(format!("invalid encyclopedia response: {e}")))?;

        Ok(body.extract.filter(|s| !s.trim().is_empty()))
    }
}
