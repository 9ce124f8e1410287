//! # Fuente Engine
//!
//! The query reformulation and source relevance ranking core, plus the chat
//! pipeline that wires it to the collaborators:
//!
//! 1. Snapshot the session transcript
//! 2. [`QueryReformulator`] — standalone vs. follow-up, self-contained rewrite
//! 3. Web search + concurrent page-content enrichment ([`SourceEnricher`])
//! 4. [`SourceRelevanceRanker`] — scored, deduplicated, size-bounded citations
//! 5. Answer assembly via the generation collaborator (complete or streamed)

pub mod enrich;
pub mod intent;
pub mod pipeline;
pub mod prompt;
pub mod rank;
pub mod reformulate;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_support;

pub use enrich::SourceEnricher;
pub use intent::ConversationalIntentClassifier;
pub use pipeline::{ChatEngine, ChatOutcome};
pub use rank::SourceRelevanceRanker;
pub use reformulate::QueryReformulator;
pub use stream_event::ChatStreamEvent;
