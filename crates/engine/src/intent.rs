//! Conversational-intent classification.
//!
//! Detects "meta" queries — questions about the conversation itself rather
//! than the world ("¿de qué hablamos antes?"). Meta queries are answered from
//! conversation history; web citations are suppressed for them regardless of
//! relevance score.
//!
//! A pure function over a configurable pattern list. False positives and
//! negatives are a tuning surface, so the patterns are configuration, not
//! structure.

/// Classifies whether a query asks about the conversation itself.
#[derive(Debug, Clone)]
pub struct ConversationalIntentClassifier {
    /// Lowercase phrases; a query containing any of them is conversational-meta.
    patterns: Vec<String>,
}

impl ConversationalIntentClassifier {
    /// Create a classifier from a pattern list. Patterns are matched as
    /// lowercase substrings.
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns: patterns.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &fuente_config::ReformulationConfig) -> Self {
        Self::new(config.meta_patterns.clone())
    }

    /// Whether the query is about the conversation itself.
    pub fn is_conversational_meta(&self, query_text: &str) -> bool {
        let lower = query_text.to_lowercase();
        self.patterns.iter().any(|p| lower.contains(p.as_str()))
    }
}
