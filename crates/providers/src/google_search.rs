//! Google Custom Search provider.
//!
//! Best-effort by contract: fewer results than requested is normal, and any
//! provider error degrades to an empty result list rather than failing the
//! request — the pipeline decides what to do with zero results.

use async_trait::async_trait;
use fuente_core::error::SearchError;
use fuente_core::retrieval::{RawSearchResult, SearchProvider};
use serde::Deserialize;
use tracing::{debug, warn};

/// A search provider backed by the Google Custom Search JSON API.
pub struct GoogleSearchProvider {
    endpoint: String,
    api_key: String,
    engine_id: String,
    client: reqwest::Client,
}

impl GoogleSearchProvider {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            client,
        })
    }

    /// Build a provider from configuration. Returns `None` when search
    /// credentials are absent (the assistant then answers from conversation
    /// context alone).
    pub fn from_config(config: &fuente_config::SearchConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let engine_id = config.engine_id.clone()?;
        Self::new(
            &config.endpoint,
            api_key,
            engine_id,
            std::time::Duration::from_secs(config.timeout_secs),
        )
        .ok()
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchProvider {
    fn name(&self) -> &str {
        "google_cse"
    }

    async fn search(
        &self,
        query: &str,
        count: usize,
    ) -> std::result::Result<Vec<RawSearchResult>, SearchError> {
        debug!(query = %query, count, "Searching Google Custom Search");

        let num = count.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(query.to_string())
                } else {
                    SearchError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            // Provider errors never abort the request; zero results is the
            // degraded condition the caller already handles.
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "Search provider returned error — degrading to no results");
            return Ok(Vec::new());
        }

        let api_response: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Network(format!("Failed to parse search response: {e}")))?;

        let results: Vec<RawSearchResult> = api_response
            .items
            .unwrap_or_default()
            .into_iter()
            .take(count)
            .map(|item| RawSearchResult {
                url: item.link,
                title: item.title.unwrap_or_default(),
                snippet: item.snippet.unwrap_or_default(),
            })
            .collect();

        debug!(returned = results.len(), requested = count, "Search complete");
        Ok(results)
    }
}

// --- Custom Search API types (internal) ---

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Option<Vec<CseItem>>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    link: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}
