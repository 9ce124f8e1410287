//! Error types for the Fuente domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Fuente operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation errors ---
    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    // --- Search errors ---
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    // --- Page fetch errors ---
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    // --- Session store errors ---
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Generator not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed output: {0}")]
    MalformedOutput(String),
}

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Search provider not configured: {0}")]
    NotConfigured(String),

    #[error("Search request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Search request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Fetch failed for {url}: {reason}")]
    Failed { url: String, reason: String },

    #[error("Fetch timed out for {0}")]
    Timeout(String),

    #[error("Content extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
