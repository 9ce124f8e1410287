//! Retrieval collaborator traits — web search and page fetching.
//!
//! Both are best-effort: the search provider may return fewer results than
//! requested and never raises for partial results; a failed page fetch is
//! non-fatal and leaves the candidate slot snippet-only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, SearchError};

/// A raw result from the search provider, before enrichment and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// The web-search collaborator.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "google_cse").
    fn name(&self) -> &str;

    /// Run a search, returning up to `count` results in provider order.
    ///
    /// Fewer results than requested is normal (provider truncation); an empty
    /// vec is the degraded condition the pipeline surfaces upward.
    async fn search(
        &self,
        query: &str,
        count: usize,
    ) -> std::result::Result<Vec<RawSearchResult>, SearchError>;
}

/// The page-fetch collaborator: URL → extracted readable text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and extract its readable text content.
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError>;
}
