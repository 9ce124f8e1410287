//! Page-fetch collaborator — URL → readable text.
//!
//! Fetches a result page and reduces it to the text a ranking pass and an
//! answer prompt can actually use: HTML converted to plain text, markdown
//! link artifacts and raw URLs stripped, whitespace collapsed, capped at a
//! configured length. Failures are non-fatal by contract; the caller keeps
//! the snippet-only candidate.

use async_trait::async_trait;
use fuente_core::error::FetchError;
use fuente_core::retrieval::PageFetcher;
use regex::Regex;
use tracing::debug;

/// A page fetcher backed by reqwest + html2text.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    max_content_chars: usize,
    link_re: Regex,
    whitespace_re: Regex,
}

impl HttpPageFetcher {
    pub fn new(timeout: std::time::Duration, max_content_chars: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Failed {
                url: String::new(),
                reason: format!("HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            max_content_chars,
            // Bare URLs and html2text's [text](target) artifacts add noise,
            // not rankable words.
            link_re: Regex::new(r"https?://\S+|\[|\]\([^)]*\)").expect("static regex"),
            whitespace_re: Regex::new(r"\s+").expect("static regex"),
        })
    }

    /// Build a fetcher from configuration.
    pub fn from_config(config: &fuente_config::FetchConfig) -> Result<Self, FetchError> {
        Self::new(
            std::time::Duration::from_secs(config.timeout_secs),
            config.max_content_chars,
        )
    }

    /// Collapse whitespace, strip links, and cap the length.
    fn clean_text(&self, text: &str) -> String {
        let without_links = self.link_re.replace_all(text, " ");
        let collapsed = self.whitespace_re.replace_all(&without_links, " ");
        let trimmed = collapsed.trim();

        // Cap on a char boundary
        trimmed.chars().take(self.max_content_chars).collect()
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Failed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Failed {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.bytes().await.map_err(|e| FetchError::Failed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let text = if content_type.contains("html") {
            html2text::from_read(&body[..], 120)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).to_string())
        } else {
            String::from_utf8_lossy(&body).to_string()
        };

        let cleaned = self.clean_text(&text);
        debug!(url = %url, chars = cleaned.len(), "Page content extracted");

        if cleaned.is_empty() {
            return Err(FetchError::Extraction {
                url: url.to_string(),
                reason: "no readable text".into(),
            });
        }

        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(cap: usize) -> HttpPageFetcher {
        HttpPageFetcher::new(std::time::Duration::from_secs(1), cap).unwrap()
    }

    #[test]
    fn clean_collapses_whitespace() {
        let f = fetcher(1000);
        assert_eq!(
            f.clean_text("una   receta\n\n  de  torta"),
            "una receta de torta"
        );
    }

    #[test]
    fn clean_strips_urls() {
        let f = fetcher(1000);
        let cleaned = f.clean_text("mira https://example.com/larga/ruta aquí");
        assert!(!cleaned.contains("example.com"));
        assert!(cleaned.contains("mira"));
        assert!(cleaned.contains("aquí"));
    }

    #[test]
    fn clean_caps_length_on_char_boundary() {
        let f = fetcher(10);
        let cleaned = f.clean_text("ñañañañañañañañaña");
        assert_eq!(cleaned.chars().count(), 10);
    }

    #[test]
    fn clean_strips_markdown_link_artifacts() {
        let f = fetcher(1000);
        let cleaned = f.clean_text("ver [la receta](recetas/torta) completa");
        assert!(!cleaned.contains("recetas/torta"));
        assert!(cleaned.contains("la receta"));
    }
}
