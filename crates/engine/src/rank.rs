//! Source relevance ranking.
//!
//! Scores a batch of retrieved candidate sources against the effective query
//! and produces the ordered, deduplicated, size-bounded citation set. A pure
//! function of its inputs: re-ranking the same batch against the same query
//! always yields the identical result.
//!
//! Scoring is lexical: weighted token overlap between the query and each
//! source's title and snippet/page content, a small bonus for allow-listed
//! authoritative hosts, and a penalty for near-duplicates of an
//! already-higher-ranked host. Weights come from configuration; only their
//! relative ordering (title > snippet > authority) is structural.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};

use fuente_config::RankingConfig;
use fuente_core::query::EffectiveQuery;
use fuente_core::source::{CandidateSource, CitationSet, ScoredSource, normalize_url};
use tracing::debug;
use url::Url;

/// Ranks candidate sources and selects the citation set.
pub struct SourceRelevanceRanker {
    config: RankingConfig,
    stop_words: HashSet<String>,
}

impl SourceRelevanceRanker {
    pub fn new(config: RankingConfig) -> Self {
        let stop_words = config
            .stop_words
            .iter()
            .map(|w| w.to_lowercase())
            .collect();
        Self { config, stop_words }
    }

    /// Rank a candidate batch against the effective query.
    ///
    /// Conversational-meta queries yield an empty set unconditionally:
    /// they must be answered from conversation history, not the web.
    /// Likewise, when no source shares a single token with the query the set
    /// is empty — absence of evidence is not disguised as evidence.
    pub fn rank(&self, query: &EffectiveQuery, candidates: &[CandidateSource]) -> CitationSet {
        if query.is_conversational_meta {
            debug!(
                candidates = candidates.len(),
                "Conversational-meta query — suppressing all citations"
            );
            return CitationSet::empty();
        }

        let query_tokens = self.tokenize_query(query.text());
        if query_tokens.is_empty() || candidates.is_empty() {
            return CitationSet::empty();
        }

        // A source that shares no token with the query is never worth citing,
        // whatever the rest of the batch looks like. When nothing matches at
        // all, the set comes out empty.
        let scored: Vec<ScoredSource> = candidates
            .iter()
            .map(|c| self.score(&query_tokens, c))
            .filter(|s| !s.matched_keywords.is_empty())
            .collect();

        if scored.is_empty() {
            debug!("No lexical overlap between query and any candidate — empty citation set");
            return CitationSet::empty();
        }

        // Deduplicate by normalized URL, keeping the best-scoring occurrence
        // (ties keep the earlier retrieval rank).
        let mut best: HashMap<String, ScoredSource> = HashMap::new();
        for source in scored {
            let key = normalize_url(&source.source.url);
            match best.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(source);
                }
                Entry::Occupied(mut slot) => {
                    let existing = slot.get();
                    let replaces = source.relevance_score > existing.relevance_score
                        || (source.relevance_score == existing.relevance_score
                            && source.source.retrieval_rank < existing.source.retrieval_rank);
                    if replaces {
                        slot.insert(source);
                    }
                }
            }
        }
        let mut selected: Vec<ScoredSource> = best.into_values().collect();
        sort_by_relevance(&mut selected);

        // Near-duplicate penalty: a later source from an already-ranked host
        // loses a configured amount of score.
        let mut seen_hosts: HashSet<String> = HashSet::new();
        for source in &mut selected {
            let host = host_of(&source.source.url);
            if !host.is_empty() && !seen_hosts.insert(host) {
                source.relevance_score -= self.config.near_duplicate_penalty;
            }
        }
        sort_by_relevance(&mut selected);

        selected.truncate(self.config.max_citations);

        debug!(
            citations = selected.len(),
            top_score = selected.first().map(|s| s.relevance_score).unwrap_or(0.0),
            "Citation set selected"
        );

        CitationSet { sources: selected }
    }

    /// Score one candidate: weighted token hits in title and body, plus the
    /// authority bonus. The bonus only strengthens sources that already
    /// matched — it never surfaces a source with no lexical overlap.
    fn score(&self, query_tokens: &[String], candidate: &CandidateSource) -> ScoredSource {
        let title_terms = self.token_set(&candidate.title);

        let mut body_text = candidate.snippet.clone();
        if let Some(content) = &candidate.page_content {
            body_text.push(' ');
            body_text.push_str(content);
        }
        let body_terms = self.token_set(&body_text);

        let mut matched = BTreeSet::new();
        let mut title_hits = 0usize;
        let mut body_hits = 0usize;
        for token in query_tokens {
            let in_title = title_terms.contains(token.as_str());
            let in_body = body_terms.contains(token.as_str());
            if in_title {
                title_hits += 1;
            }
            if in_body {
                body_hits += 1;
            }
            if in_title || in_body {
                matched.insert(token.clone());
            }
        }

        let mut score = self.config.title_weight * title_hits as f32
            + self.config.snippet_weight * body_hits as f32;

        if !matched.is_empty() && self.is_authority(&candidate.url) {
            score += self.config.authority_bonus;
        }

        ScoredSource {
            source: candidate.clone(),
            relevance_score: score,
            matched_keywords: matched,
        }
    }

    /// Tokenize the query into ordered, unique, stop-word-filtered tokens.
    fn tokenize_query(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for token in split_tokens(text) {
            if self.stop_words.contains(&token) {
                continue;
            }
            if seen.insert(token.clone()) {
                out.push(token);
            }
        }
        out
    }

    /// Tokenize source text into a lookup set. Stop words are irrelevant here
    /// since only query tokens are probed.
    fn token_set(&self, text: &str) -> HashSet<String> {
        split_tokens(text).collect()
    }

    fn is_authority(&self, url: &str) -> bool {
        let host = host_of(url);
        if host.is_empty() {
            return false;
        }
        self.config.authority_domains.iter().any(|domain| {
            let domain = domain.to_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }
}

/// Lowercased word tokens: runs of Unicode alphanumerics, length ≥ 2 so
/// stray single letters don't count as matches.
fn split_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
}

/// Descending score; ties broken by ascending retrieval rank so the search
/// provider's ordering signal survives.
fn sort_by_relevance(sources: &mut [ScoredSource]) {
    sources.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source.retrieval_rank.cmp(&b.source.retrieval_rank))
    });
}

fn host_of(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let host = parsed
        .host_str()
        .unwrap_or_default()
        .to_ascii_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}
