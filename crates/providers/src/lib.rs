//! Collaborator implementations for Fuente.
//!
//! - [`OpenAiCompatGenerator`] — text generation against any
//!   OpenAI-compatible chat-completions endpoint
//! - [`GoogleSearchProvider`] — web search via Google Custom Search
//! - [`HttpPageFetcher`] — page-content extraction for result enrichment

pub mod google_search;
pub mod openai_compat;
pub mod page_fetch;

pub use google_search::GoogleSearchProvider;
pub use openai_compat::OpenAiCompatGenerator;
pub use page_fetch::HttpPageFetcher;
