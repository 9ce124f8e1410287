//! The chat pipeline.
//!
//! Orchestrates one request end to end: transcript snapshot → query
//! reformulation → web search → page-content enrichment → relevance ranking →
//! answer generation → transcript append.
//!
//! Availability beats citation completeness: every collaborator failure
//! degrades locally (logged, never raised), and only a *total* search failure
//! is surfaced upward via the `degraded` flag so transports can tell callers
//! the answer came from conversation context alone.

use std::sync::Arc;
use std::time::Duration;

use fuente_config::AppConfig;
use fuente_core::generate::{GenerationRequest, Generator};
use fuente_core::query::EffectiveQuery;
use fuente_core::retrieval::{PageFetcher, SearchProvider};
use fuente_core::source::CitationSet;
use fuente_core::store::SessionStore;
use fuente_core::turn::{ConversationTurn, SessionId, Transcript};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::enrich::SourceEnricher;
use crate::prompt;
use crate::rank::SourceRelevanceRanker;
use crate::reformulate::QueryReformulator;
use crate::stream_event::ChatStreamEvent;

/// The outcome of one chat request.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub session_id: SessionId,
    pub answer: String,
    pub citations: CitationSet,
    pub query: EffectiveQuery,
    /// True when the answer had to be produced without web evidence
    /// (total search failure) or without the generation collaborator.
    pub degraded: bool,
}

/// Everything the answer step needs, computed once per request.
struct Prepared {
    history: Transcript,
    query: EffectiveQuery,
    citations: CitationSet,
    degraded: bool,
}

/// The retrieval-augmented chat engine.
pub struct ChatEngine {
    generator: Arc<dyn Generator>,
    search: Option<Arc<dyn SearchProvider>>,
    store: Arc<dyn SessionStore>,
    reformulator: QueryReformulator,
    ranker: SourceRelevanceRanker,
    enricher: SourceEnricher,
    generation: fuente_config::GenerationConfig,
    history_window: usize,
    retrieval_count: usize,
}

impl ChatEngine {
    /// Assemble the engine from its collaborators and configuration.
    pub fn new(
        generator: Arc<dyn Generator>,
        search: Option<Arc<dyn SearchProvider>>,
        fetcher: Option<Arc<dyn PageFetcher>>,
        store: Arc<dyn SessionStore>,
        config: &AppConfig,
    ) -> Self {
        let reformulator = QueryReformulator::new(
            generator.clone(),
            config.reformulation.clone(),
            config.generation.model.clone(),
        );
        let ranker = SourceRelevanceRanker::new(config.ranking.clone());
        let enricher = SourceEnricher::new(
            if config.fetch.enabled { fetcher } else { None },
            Duration::from_secs(config.fetch.timeout_secs),
        );

        Self {
            generator,
            search,
            store,
            reformulator,
            ranker,
            enricher,
            generation: config.generation.clone(),
            history_window: config.reformulation.history_window,
            retrieval_count: config.search.retrieval_count,
        }
    }

    /// Handle one utterance and return the complete cited answer.
    ///
    /// Infallible by design: every failure path degrades to a poorer answer
    /// instead of an error.
    pub async fn respond(&self, session: &SessionId, utterance: &str) -> ChatOutcome {
        let prepared = self.prepare(session, utterance).await;
        self.record_user_turn(session, utterance).await;

        let request = self.answer_request(&prepared);
        let (answer, degraded) = match self.generator.complete(request).await {
            Ok(output) => (output.into_text(), prepared.degraded),
            Err(e) => {
                warn!(error = %e, "Answer generation failed — returning fallback answer");
                (self.fallback_answer(&prepared), true)
            }
        };

        self.record_assistant_turn(session, &answer, &prepared.citations)
            .await;

        info!(
            session = %session,
            citations = prepared.citations.len(),
            follow_up = prepared.query.is_follow_up,
            degraded,
            "Chat request complete"
        );

        ChatOutcome {
            session_id: session.clone(),
            answer,
            citations: prepared.citations,
            query: prepared.query,
            degraded,
        }
    }

    /// Handle one utterance as an incremental stream of [`ChatStreamEvent`]s.
    ///
    /// When the receiver is dropped (client disconnect), generator
    /// consumption stops promptly; no session lock is ever held across the
    /// stream.
    pub fn respond_stream(
        self: Arc<Self>,
        session: SessionId,
        utterance: String,
    ) -> mpsc::Receiver<ChatStreamEvent> {
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let prepared = self.prepare(&session, &utterance).await;
            self.record_user_turn(&session, &utterance).await;

            let request = self.answer_request(&prepared);
            let mut answer = String::new();
            let mut degraded = prepared.degraded;

            match self.generator.stream(request).await {
                Ok(mut chunks) => {
                    while let Some(chunk) = chunks.recv().await {
                        match chunk {
                            Ok(chunk) => {
                                if let Some(content) = chunk.content
                                    && !content.is_empty()
                                {
                                    answer.push_str(&content);
                                    if tx.send(ChatStreamEvent::Chunk { content }).await.is_err() {
                                        // Client disconnected — stop consuming
                                        // the generator right away.
                                        debug!(session = %session, "Stream receiver dropped mid-answer");
                                        return;
                                    }
                                }
                                if chunk.done {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Generation stream interrupted");
                                degraded = true;
                                let _ = tx
                                    .send(ChatStreamEvent::Error {
                                        message: e.to_string(),
                                    })
                                    .await;
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Streaming generation failed — sending fallback answer");
                    degraded = true;
                    answer = self.fallback_answer(&prepared);
                    if tx
                        .send(ChatStreamEvent::Chunk {
                            content: answer.clone(),
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }

            if !prepared.citations.is_empty() {
                let _ = tx
                    .send(ChatStreamEvent::Sources {
                        sources: prepared.citations.sources.clone(),
                    })
                    .await;
            }

            if !answer.is_empty() {
                self.record_assistant_turn(&session, &answer, &prepared.citations)
                    .await;
            }

            let _ = tx
                .send(ChatStreamEvent::Done {
                    session_id: session.to_string(),
                    is_follow_up: prepared.query.is_follow_up,
                    degraded,
                })
                .await;
        });

        rx
    }

    /// The shared non-generative half of the pipeline.
    async fn prepare(&self, session: &SessionId, utterance: &str) -> Prepared {
        // A corrupt or missing session reads as a fresh one, never an error.
        let history = match self.store.history(session).await {
            Ok(history) => history,
            Err(e) => {
                warn!(session = %session, error = %e, "Session read failed — treating as fresh session");
                Transcript::new()
            }
        };

        let query = self.reformulator.reformulate(utterance, &history).await;

        // Retrieval always runs to the configured count — including for
        // conversational-meta queries, whose citations are suppressed later.
        let raw = match &self.search {
            Some(provider) => match provider.search(query.text(), self.retrieval_count).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(error = %e, query = %query.text(), "Search failed — continuing without web results");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let degraded = raw.is_empty() && !query.is_conversational_meta;
        let candidates = self.enricher.enrich(raw).await;
        let citations = self.ranker.rank(&query, &candidates);

        if query.is_conversational_meta && !candidates.is_empty() {
            debug!(
                suppressed = candidates.len(),
                "Retrieved sources suppressed for conversational-meta query"
            );
        }

        Prepared {
            history,
            query,
            citations,
            degraded,
        }
    }

    fn answer_request(&self, prepared: &Prepared) -> GenerationRequest {
        let mut request = GenerationRequest::new(
            &self.generation.model,
            prompt::build_answer_prompt(&prepared.query, &prepared.citations),
        );
        request.system = Some(prompt::ANSWER_SYSTEM_PROMPT.to_string());
        // Twice the reformulation window: user/assistant pairs.
        request.history = prepared
            .history
            .last_window(self.history_window * 2)
            .to_vec();
        request.temperature = self.generation.temperature;
        request.max_tokens = Some(self.generation.max_tokens);
        request
    }

    /// What the user sees when the generation collaborator is unavailable.
    fn fallback_answer(&self, prepared: &Prepared) -> String {
        if prepared.citations.is_empty() {
            "No pude generar una respuesta en este momento. Inténtalo de nuevo en unos minutos."
                .to_string()
        } else {
            let mut answer = String::from(
                "No pude generar una respuesta en este momento. Estas fuentes pueden ayudarte:\n",
            );
            for scored in &prepared.citations.sources {
                answer.push_str(&format!(
                    "- {}: {}\n",
                    scored.source.title, scored.source.url
                ));
            }
            answer
        }
    }

    async fn record_user_turn(&self, session: &SessionId, utterance: &str) {
        if let Err(e) = self
            .store
            .append(session, ConversationTurn::user(utterance))
            .await
        {
            warn!(session = %session, error = %e, "Failed to record user turn");
        }
    }

    async fn record_assistant_turn(
        &self,
        session: &SessionId,
        answer: &str,
        citations: &CitationSet,
    ) {
        let turn = ConversationTurn::assistant(answer).with_cited_urls(citations.urls());
        if let Err(e) = self.store.append(session, turn).await {
            warn!(session = %session, error = %e, "Failed to record assistant turn");
        }
    }
}
