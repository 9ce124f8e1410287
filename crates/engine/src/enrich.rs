//! Candidate enrichment — raw search results to candidate sources.
//!
//! Assigns retrieval ranks and, when a page fetcher is configured, pulls the
//! page text for every result concurrently (the retrieval count is small and
//! fixed, so all fetches fly at once). Each fetch carries its own timeout;
//! a failed or timed-out fetch keeps the snippet-only candidate rather than
//! dropping the slot, so the ranker always sees everything the provider
//! returned.

use std::sync::Arc;
use std::time::Duration;

use fuente_core::retrieval::{PageFetcher, RawSearchResult};
use fuente_core::source::CandidateSource;
use tracing::debug;

/// Turns raw search results into (optionally content-enriched) candidates.
pub struct SourceEnricher {
    fetcher: Option<Arc<dyn PageFetcher>>,
    fetch_timeout: Duration,
}

impl SourceEnricher {
    pub fn new(fetcher: Option<Arc<dyn PageFetcher>>, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            fetch_timeout,
        }
    }

    /// Enrich a result batch, preserving provider order and ranks.
    pub async fn enrich(&self, results: Vec<RawSearchResult>) -> Vec<CandidateSource> {
        let mut candidates: Vec<CandidateSource> = results
            .into_iter()
            .enumerate()
            .map(|(rank, r)| CandidateSource {
                url: r.url,
                title: r.title,
                snippet: r.snippet,
                page_content: None,
                retrieval_rank: rank,
            })
            .collect();

        let Some(fetcher) = &self.fetcher else {
            return candidates;
        };

        let timeout = self.fetch_timeout;
        let fetches = candidates.iter().map(|c| {
            let fetcher = fetcher.clone();
            let url = c.url.clone();
            async move { tokio::time::timeout(timeout, fetcher.fetch_text(&url)).await }
        });

        let outcomes = futures::future::join_all(fetches).await;

        for (candidate, outcome) in candidates.iter_mut().zip(outcomes) {
            match outcome {
                Ok(Ok(text)) => candidate.page_content = Some(text),
                Ok(Err(e)) => {
                    debug!(url = %candidate.url, error = %e, "Page fetch failed — keeping snippet only");
                }
                Err(_) => {
                    debug!(url = %candidate.url, "Page fetch timed out — keeping snippet only");
                }
            }
        }

        candidates
    }
}
