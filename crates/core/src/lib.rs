//! # Fuente Core
//!
//! Domain types, traits, and error definitions for the Fuente conversational
//! assistant. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (text generation, web search, page fetching,
//! session storage) is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod generate;
pub mod query;
pub mod retrieval;
pub mod source;
pub mod store;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use generate::{GenerationChunk, GenerationOutput, GenerationRequest, Generator};
pub use query::EffectiveQuery;
pub use retrieval::{PageFetcher, RawSearchResult, SearchProvider};
pub use source::{CandidateSource, CitationSet, ScoredSource, normalize_url};
pub use store::SessionStore;
pub use turn::{ConversationTurn, Role, SessionId, Transcript};
