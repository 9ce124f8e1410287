//! The effective query — what actually gets sent to web search.
//!
//! Produced once per request by the reformulator, consumed by the search
//! collaborator and the relevance ranker. Never persisted.

use serde::{Deserialize, Serialize};

/// The outcome of query reformulation for a single utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveQuery {
    /// The user's utterance, verbatim.
    pub original: String,

    /// The self-contained rewrite, when the utterance was a follow-up and the
    /// rewrite collaborator produced a usable one.
    pub rewritten: Option<String>,

    /// Whether the utterance was classified as a follow-up to prior turns.
    pub is_follow_up: bool,

    /// Whether the utterance asks about the conversation itself rather than
    /// the world ("what did we discuss earlier?").
    pub is_conversational_meta: bool,
}

impl EffectiveQuery {
    /// A standalone query: the original text is used as-is.
    pub fn standalone(original: impl Into<String>, is_conversational_meta: bool) -> Self {
        Self {
            original: original.into(),
            rewritten: None,
            is_follow_up: false,
            is_conversational_meta,
        }
    }

    /// The text to hand to the search collaborator: the rewrite when present,
    /// otherwise the original utterance.
    pub fn text(&self) -> &str {
        self.rewritten.as_deref().unwrap_or(&self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_uses_original_text() {
        let q = EffectiveQuery::standalone("mejores rutas de senderismo", false);
        assert_eq!(q.text(), "mejores rutas de senderismo");
        assert!(!q.is_follow_up);
        assert!(q.rewritten.is_none());
    }

    #[test]
    fn rewritten_text_wins() {
        let q = EffectiveQuery {
            original: "¿y con qué lo acompaño?".into(),
            rewritten: Some("con qué acompañar puré de papas".into()),
            is_follow_up: true,
            is_conversational_meta: false,
        };
        assert_eq!(q.text(), "con qué acompañar puré de papas");
    }
}
