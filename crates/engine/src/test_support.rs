//! Shared scripted mocks for engine tests.

use std::sync::Mutex;

use async_trait::async_trait;
use fuente_core::error::{FetchError, GeneratorError, SearchError};
use fuente_core::generate::{GenerationOutput, GenerationRequest, Generator, StructuredMessage};
use fuente_core::retrieval::{PageFetcher, RawSearchResult, SearchProvider};

/// A mock generator that returns a sequence of scripted outputs.
///
/// Each call to `complete` returns the next output in the queue and records
/// the request. Panics if more calls are made than outputs provided.
pub struct ScriptedGenerator {
    outputs: Mutex<Vec<Result<GenerationOutput, GeneratorError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    call_count: Mutex<usize>,
}

impl ScriptedGenerator {
    pub fn sequence(outputs: Vec<Result<GenerationOutput, GeneratorError>>) -> Self {
        Self {
            outputs: Mutex::new(outputs),
            requests: Mutex::new(Vec::new()),
            call_count: Mutex::new(0),
        }
    }

    /// A generator with no scripted outputs — panics if consulted.
    pub fn empty() -> Self {
        Self::sequence(Vec::new())
    }

    /// A generator that returns a single plain-text output.
    pub fn text(text: &str) -> Self {
        Self::sequence(vec![Ok(GenerationOutput::PlainText(text.into()))])
    }

    /// A generator that returns the same plain-text output on every call.
    pub fn always_text(text: &str) -> Self {
        Self::sequence(vec![
            Ok(GenerationOutput::PlainText(text.into()));
            8
        ])
    }

    /// A generator that returns a single structured-message output.
    pub fn structured(message: StructuredMessage) -> Self {
        Self::sequence(vec![Ok(GenerationOutput::Structured(message))])
    }

    /// A generator whose every call fails with a clone of the given error.
    pub fn failing(error: GeneratorError) -> Self {
        Self::sequence(vec![Err(error); 8])
    }

    pub fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutput, GeneratorError> {
        self.requests.lock().unwrap().push(request);

        let mut count = self.call_count.lock().unwrap();
        let outputs = self.outputs.lock().unwrap();

        if *count >= outputs.len() {
            panic!(
                "ScriptedGenerator: no more outputs (call #{}, have {})",
                *count,
                outputs.len()
            );
        }

        let output = outputs[*count].clone();
        *count += 1;
        output
    }
}

/// A mock search provider returning a fixed result list.
pub struct ScriptedSearch {
    results: Vec<RawSearchResult>,
    fail: bool,
}

impl ScriptedSearch {
    pub fn with_results(results: Vec<RawSearchResult>) -> Self {
        Self {
            results,
            fail: false,
        }
    }

    pub fn empty() -> Self {
        Self::with_results(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    fn name(&self) -> &str {
        "scripted_search"
    }

    async fn search(
        &self,
        _query: &str,
        count: usize,
    ) -> Result<Vec<RawSearchResult>, SearchError> {
        if self.fail {
            return Err(SearchError::Network("scripted failure".into()));
        }
        Ok(self.results.iter().take(count).cloned().collect())
    }
}

/// A mock page fetcher.
pub struct ScriptedFetcher {
    content: Option<String>,
}

impl ScriptedFetcher {
    /// Returns the given text for every URL.
    pub fn always(content: &str) -> Self {
        Self {
            content: Some(content.into()),
        }
    }

    /// Fails every fetch.
    pub fn failing() -> Self {
        Self { content: None }
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        match &self.content {
            Some(content) => Ok(content.clone()),
            None => Err(FetchError::Failed {
                url: url.to_string(),
                reason: "scripted failure".into(),
            }),
        }
    }
}

/// A plausible five-result recipe search batch.
pub fn recipe_results() -> Vec<RawSearchResult> {
    vec![
        RawSearchResult {
            url: "https://recetas.example/torta-de-manzana".into(),
            title: "Torta de manzana casera".into(),
            snippet: "Receta de torta de manzana paso a paso".into(),
        },
        RawSearchResult {
            url: "https://cocina.example/decoracion-tortas".into(),
            title: "Decoración de tortas".into(),
            snippet: "Ideas para decorar una torta de manzana".into(),
        },
        RawSearchResult {
            url: "https://blog.example/postres".into(),
            title: "Postres fáciles".into(),
            snippet: "Los mejores postres caseros, incluida la torta de manzana".into(),
        },
        RawSearchResult {
            url: "https://foro.example/hilo-tortas".into(),
            title: "Foro de repostería".into(),
            snippet: "Discusión sobre tortas y tartas".into(),
        },
        RawSearchResult {
            url: "https://noticias.example/gastronomia".into(),
            title: "Gastronomía hoy".into(),
            snippet: "Tendencias gastronómicas".into(),
        },
    ]
}
