//! Configuration loading, validation, and management for Fuente.
//!
//! Loads configuration from `~/.fuente/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.fuente/config.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Text-generation backend settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Web-search collaborator settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Page-fetch collaborator settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Relevance-ranking weights and citation limits
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Follow-up detection and query-rewrite settings
    #[serde(default)]
    pub reformulation: ReformulationConfig,

    /// Session store settings
    #[serde(default)]
    pub session: SessionConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("generation", &self.generation)
            .field("search", &self.search)
            .field("fetch", &self.fetch)
            .field("ranking", &self.ranking)
            .field("reformulation", &self.reformulation)
            .field("session", &self.session)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_generation_url")]
    pub api_url: String,

    /// API key (usually provided via environment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout for generation calls
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_generation_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_generation_timeout() -> u64 {
    30
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: default_generation_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search API endpoint (Google Custom Search by default)
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom search engine id (`cx` parameter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_id: Option<String>,

    /// How many results to retrieve per query. Retrieval always runs to this
    /// count regardless of how many citations survive ranking.
    #[serde(default = "default_retrieval_count")]
    pub retrieval_count: usize,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_retrieval_count() -> usize {
    5
}
fn default_search_timeout() -> u64 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key: None,
            engine_id: None,
            retrieval_count: default_retrieval_count(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("engine_id", &self.engine_id)
            .field("retrieval_count", &self.retrieval_count)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Whether to enrich results with fetched page content
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Cap on extracted page text, in characters
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_fetch_timeout() -> u64 {
    5
}
fn default_max_content_chars() -> usize {
    1000
}
fn default_true() -> bool {
    true
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_fetch_timeout(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Weight for query tokens matched in a source's title
    #[serde(default = "default_title_weight")]
    pub title_weight: f32,

    /// Weight for query tokens matched in the snippet/page content
    #[serde(default = "default_snippet_weight")]
    pub snippet_weight: f32,

    /// Flat bonus for sources on the authority allow-list
    #[serde(default = "default_authority_bonus")]
    pub authority_bonus: f32,

    /// Penalty applied to later sources from an already-cited host
    #[serde(default = "default_near_duplicate_penalty")]
    pub near_duplicate_penalty: f32,

    /// Maximum number of citations to surface with an answer
    #[serde(default = "default_max_citations")]
    pub max_citations: usize,

    /// Hosts treated as authoritative/official
    #[serde(default)]
    pub authority_domains: Vec<String>,

    /// Tokens excluded from relevance matching
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

fn default_title_weight() -> f32 {
    3.0
}
fn default_snippet_weight() -> f32 {
    1.0
}
fn default_authority_bonus() -> f32 {
    0.5
}
fn default_near_duplicate_penalty() -> f32 {
    0.5
}
fn default_max_citations() -> usize {
    5
}

fn default_stop_words() -> Vec<String> {
    [
        // Spanish
        "de", "la", "el", "en", "y", "a", "los", "las", "que", "qué", "un", "una", "con", "para",
        "por", "del", "al", "se", "es", "lo", "le", "mi", "su", "como", "cómo", "más", "o", "no",
        "me", "te", "puedo", "puede",
        // English
        "the", "a", "an", "of", "to", "in", "on", "for", "and", "or", "is", "are", "was", "what",
        "how", "with", "it", "this", "that", "my", "your", "i", "you", "can", "do", "does",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            title_weight: default_title_weight(),
            snippet_weight: default_snippet_weight(),
            authority_bonus: default_authority_bonus(),
            near_duplicate_penalty: default_near_duplicate_penalty(),
            max_citations: default_max_citations(),
            authority_domains: Vec::new(),
            stop_words: default_stop_words(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReformulationConfig {
    /// Whether follow-up rewriting is enabled at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How many prior turns to hand to the rewrite collaborator
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Utterances shorter than this many tokens are follow-up candidates
    /// whenever the session has prior turns
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,

    /// Words that signal an unresolved referring expression
    #[serde(default = "default_anaphora_patterns")]
    pub anaphora_patterns: Vec<String>,

    /// Lowercase phrases that mark a query as being about the conversation
    /// itself rather than the world
    #[serde(default = "default_meta_patterns")]
    pub meta_patterns: Vec<String>,
}

fn default_history_window() -> usize {
    3
}
fn default_min_tokens() -> usize {
    4
}

fn default_anaphora_patterns() -> Vec<String> {
    [
        // Spanish clitic pronouns and deictics
        "lo", "la", "le", "los", "las", "les", "eso", "esto", "esta", "este", "ahí", "allí",
        "arriba", "encima", "también",
        // English
        "it", "that", "this", "there", "them", "those", "one",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_meta_patterns() -> Vec<String> {
    [
        "de que hablamos",
        "de qué hablamos",
        "sobre que estuvimos hablando",
        "sobre qué estuvimos hablando",
        "que estábamos discutiendo",
        "qué estábamos discutiendo",
        "cual fue nuestra conversación",
        "cuál fue nuestra conversación",
        "que me dijiste",
        "qué me dijiste",
        "que te pregunté",
        "qué te pregunté",
        "tema anterior",
        "estábamos hablando",
        "what did we discuss",
        "what were we talking about",
        "what did you say",
        "what did i ask",
        "earlier in this conversation",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ReformulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            history_window: default_history_window(),
            min_tokens: default_min_tokens(),
            anaphora_patterns: default_anaphora_patterns(),
            meta_patterns: default_meta_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Backend: "memory" or "file"
    #[serde(default = "default_session_backend")]
    pub backend: String,

    /// Path for the file backend (defaults to ~/.fuente/sessions.jsonl)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

fn default_session_backend() -> String {
    "memory".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.fuente/config.toml).
    ///
    /// Also checks environment variables:
    /// - `FUENTE_API_KEY` / `OPENAI_API_KEY` — generation API key
    /// - `FUENTE_SEARCH_KEY` / `GOOGLE_API_KEY` — search API key
    /// - `FUENTE_SEARCH_ENGINE` / `GOOGLE_CX` — search engine id
    /// - `FUENTE_MODEL` — generation model override
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.generation.api_key.is_none() {
            config.generation.api_key = std::env::var("FUENTE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if config.search.api_key.is_none() {
            config.search.api_key = std::env::var("FUENTE_SEARCH_KEY")
                .ok()
                .or_else(|| std::env::var("GOOGLE_API_KEY").ok());
        }
        if config.search.engine_id.is_none() {
            config.search.engine_id = std::env::var("FUENTE_SEARCH_ENGINE")
                .ok()
                .or_else(|| std::env::var("GOOGLE_CX").ok());
        }
        if let Ok(model) = std::env::var("FUENTE_MODEL") {
            config.generation.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".fuente")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.temperature < 0.0 || self.generation.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        // Relative ordering of relevance weights: title > snippet > authority ≥ 0.
        let r = &self.ranking;
        if !(r.title_weight > r.snippet_weight && r.snippet_weight > r.authority_bonus) {
            return Err(ConfigError::ValidationError(
                "ranking weights must satisfy title_weight > snippet_weight > authority_bonus"
                    .into(),
            ));
        }
        if r.authority_bonus < 0.0 || r.near_duplicate_penalty < 0.0 {
            return Err(ConfigError::ValidationError(
                "ranking.authority_bonus and ranking.near_duplicate_penalty must be >= 0".into(),
            ));
        }

        if self.ranking.max_citations == 0 {
            return Err(ConfigError::ValidationError(
                "ranking.max_citations must be >= 1".into(),
            ));
        }
        if self.search.retrieval_count < self.ranking.max_citations {
            return Err(ConfigError::ValidationError(
                "search.retrieval_count must be >= ranking.max_citations".into(),
            ));
        }

        if self.reformulation.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "reformulation.history_window must be >= 1".into(),
            ));
        }

        match self.session.backend.as_str() {
            "memory" | "file" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "session.backend must be 'memory' or 'file', got '{other}'"
                )));
            }
        }

        Ok(())
    }

    /// Whether the generation backend has a key available.
    pub fn has_generation_key(&self) -> bool {
        self.generation.api_key.is_some()
    }

    /// Whether the search collaborator is fully configured.
    pub fn has_search_credentials(&self) -> bool {
        self.search.api_key.is_some() && self.search.engine_id.is_some()
    }

    /// Generate a default config TOML string (for `fuente init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.retrieval_count, 5);
        assert_eq!(config.ranking.max_citations, 5);
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.generation.model, config.generation.model);
        assert_eq!(parsed.ranking.max_citations, config.ranking.max_citations);
    }

    #[test]
    fn weight_ordering_enforced() {
        let mut config = AppConfig::default();
        config.ranking.snippet_weight = 10.0; // now snippet > title
        assert!(config.validate().is_err());
    }

    #[test]
    fn retrieval_count_must_cover_citation_cap() {
        let mut config = AppConfig::default();
        config.search.retrieval_count = 3;
        config.ranking.max_citations = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_session_backend_rejected() {
        let mut config = AppConfig::default();
        config.session.backend = "redis".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.generation.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.generation.model, "gpt-4o-mini");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("customsearch"));
        assert!(toml_str.contains("title_weight"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.generation.api_key = Some("sk-very-secret".into());
        config.search.api_key = Some("also-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn meta_patterns_cover_spanish_defaults() {
        let config = ReformulationConfig::default();
        assert!(config.meta_patterns.iter().any(|p| p == "de qué hablamos"));
        assert!(config.meta_patterns.iter().any(|p| p == "tema anterior"));
    }

    #[test]
    fn parse_partial_config_uses_section_defaults() {
        let toml_str = r#"
[gateway]
port = 9090

[ranking]
title_weight = 5.0
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gateway.port, 9090);
        assert!((config.ranking.title_weight - 5.0).abs() < f32::EPSILON);
        // Untouched sections keep defaults
        assert_eq!(config.search.retrieval_count, 5);
        assert!(config.reformulation.enabled);
    }
}
