//! Candidate web sources and the citation set surfaced with an answer.
//!
//! A `CandidateSource` is what the search collaborator hands back (optionally
//! enriched with fetched page content). The ranker turns candidates into
//! `ScoredSource`s and selects an ordered, deduplicated, size-bounded
//! `CitationSet`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use url::Url;

/// A raw retrieved source, before relevance scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSource {
    /// The source URL.
    pub url: String,

    /// Result title as reported by the search provider.
    pub title: String,

    /// Short snippet as reported by the search provider.
    pub snippet: String,

    /// Extracted page text, when the page fetch succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_content: Option<String>,

    /// Zero-based position in the search provider's result ordering.
    pub retrieval_rank: usize,
}

/// A candidate source plus its relevance score. Ephemeral — exists only for
/// the duration of one ranking pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSource {
    #[serde(flatten)]
    pub source: CandidateSource,

    /// Weighted lexical relevance score.
    pub relevance_score: f32,

    /// Query tokens found in the source's title or body.
    pub matched_keywords: BTreeSet<String>,
}

/// The ordered, deduplicated, size-bounded set of sources worth citing.
///
/// Invariants: sorted descending by `relevance_score` with stable tie-break by
/// ascending `retrieval_rank`; no duplicate normalized URLs; length never
/// exceeds the configured citation cap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitationSet {
    pub sources: Vec<ScoredSource>,
}

impl CitationSet {
    /// An empty citation set — used for conversational-meta queries and when
    /// no source has any lexical overlap with the query.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// The cited URLs, in citation order.
    pub fn urls(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.source.url.clone()).collect()
    }
}

/// Normalize a URL for duplicate detection: scheme + lowercased host + path,
/// query-string and fragment insensitive. A leading `www.` and a trailing
/// slash are not considered distinguishing.
///
/// Unparseable input falls back to the trimmed, lowercased raw string so that
/// dedup still behaves sensibly on malformed provider data.
pub fn normalize_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw.trim()) else {
        return raw.trim().trim_end_matches('/').to_ascii_lowercase();
    };

    let host = parsed
        .host_str()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = parsed.path().trim_end_matches('/');

    format!("{}://{}{}", parsed.scheme(), host, path)
}
