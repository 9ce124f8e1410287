//! Query reformulation — standalone vs. follow-up, and the rewrite.
//!
//! An utterance is a *follow-up candidate* when it carries a referring
//! expression with no antecedent of its own ("¿y con qué lo acompaño?") or is
//! too short to stand alone while the session already has history. Candidates
//! are rewritten into self-contained search queries by the text-generation
//! collaborator, conditioned on a bounded window of recent turns — never the
//! whole transcript, so the rewrite prompt stays compact and stable.
//!
//! Reformulation is a best-effort enhancement: any failure (timeout,
//! malformed output, empty rewrite) falls back to the original utterance
//! verbatim and is logged, never surfaced to the caller.

use std::sync::Arc;

use fuente_config::ReformulationConfig;
use fuente_core::generate::{GenerationRequest, Generator};
use fuente_core::query::EffectiveQuery;
use fuente_core::turn::{ConversationTurn, Role, Transcript};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::intent::ConversationalIntentClassifier;

/// Instruction for the rewrite collaborator.
const REWRITE_INSTRUCTION: &str = "Dada la conversación anterior y la consulta del usuario, \
reformula la consulta como una búsqueda web autónoma y completa que no dependa del contexto. \
Responde únicamente con la consulta reformulada, sin comillas ni texto adicional.";

/// Label prefixes some models prepend despite the instruction.
const REWRITE_LABELS: &[&str] = &[
    "consulta reformulada:",
    "pregunta reformulada:",
    "reformulated query:",
    "query:",
    "consulta:",
];

/// How much of an assistant turn to include in the rewrite window.
const ASSISTANT_EXCERPT_CHARS: usize = 200;

/// Decides standalone vs. follow-up and produces the effective query.
pub struct QueryReformulator {
    generator: Arc<dyn Generator>,
    classifier: ConversationalIntentClassifier,
    config: ReformulationConfig,
    model: String,
    anaphora_re: Regex,
}

impl QueryReformulator {
    pub fn new(
        generator: Arc<dyn Generator>,
        config: ReformulationConfig,
        model: impl Into<String>,
    ) -> Self {
        let classifier = ConversationalIntentClassifier::new(config.meta_patterns.clone());
        let anaphora_re = build_anaphora_regex(&config.anaphora_patterns);
        Self {
            generator,
            classifier,
            config,
            model: model.into(),
            anaphora_re,
        }
    }

    /// The classifier this reformulator consults (shared with the ranker's
    /// callers).
    pub fn classifier(&self) -> &ConversationalIntentClassifier {
        &self.classifier
    }

    /// Produce the effective query for an utterance given the session
    /// transcript snapshot.
    pub async fn reformulate(&self, utterance: &str, history: &Transcript) -> EffectiveQuery {
        let mut is_conversational_meta = self.classifier.is_conversational_meta(utterance);

        if !self.config.enabled || !self.is_follow_up_candidate(utterance, history) {
            return EffectiveQuery {
                original: utterance.to_string(),
                rewritten: None,
                is_follow_up: false,
                is_conversational_meta,
            };
        }

        let rewritten = match self.request_rewrite(utterance, history).await {
            Ok(Some(text)) => {
                info!(original = %utterance, rewritten = %text, "Follow-up rewritten");
                Some(text)
            }
            Ok(None) => {
                debug!(original = %utterance, "Rewrite produced nothing usable — keeping original");
                None
            }
            Err(e) => {
                // Best-effort by design: degrade to the original utterance.
                warn!(error = %e, original = %utterance, "Rewrite collaborator failed — keeping original");
                None
            }
        };

        // A rewrite must never hide an explicitly meta utterance, and may
        // itself reveal one.
        if let Some(text) = &rewritten {
            is_conversational_meta |= self.classifier.is_conversational_meta(text);
        }

        EffectiveQuery {
            original: utterance.to_string(),
            rewritten,
            is_follow_up: true,
            is_conversational_meta,
        }
    }

    /// Whether the utterance needs context injection: an anaphoric referring
    /// expression, or too short to stand alone. Both require prior history —
    /// with none, every utterance is standalone.
    fn is_follow_up_candidate(&self, utterance: &str, history: &Transcript) -> bool {
        if history.is_empty() {
            return false;
        }
        if self.anaphora_re.is_match(utterance) {
            return true;
        }
        utterance.split_whitespace().count() < self.config.min_tokens
    }

    async fn request_rewrite(
        &self,
        utterance: &str,
        history: &Transcript,
    ) -> Result<Option<String>, fuente_core::error::GeneratorError> {
        let window = history.last_window(self.config.history_window);
        let prompt = build_rewrite_prompt(window, utterance);

        let mut request = GenerationRequest::new(&self.model, prompt);
        request.system = Some(REWRITE_INSTRUCTION.to_string());
        // Rewrites should be deterministic and short.
        request.temperature = 0.0;
        request.max_tokens = Some(128);

        let output = self.generator.complete(request).await?;
        Ok(extract_rewrite(&output.into_text()))
    }
}

/// Word-boundary alternation over the configured anaphora markers,
/// case-insensitive.
fn build_anaphora_regex(patterns: &[String]) -> Regex {
    let escaped: Vec<String> = patterns.iter().map(|p| regex::escape(p)).collect();
    let source = if escaped.is_empty() {
        // Never matches
        r"\b\B".to_string()
    } else {
        format!(r"(?i)\b({})\b", escaped.join("|"))
    };
    Regex::new(&source).unwrap_or_else(|_| Regex::new(r"\b\B").expect("static regex"))
}

/// Format the bounded history window for the rewrite prompt. Assistant turns
/// are excerpted so the prompt stays compact.
fn build_rewrite_prompt(window: &[ConversationTurn], utterance: &str) -> String {
    let mut prompt = String::from("Conversación reciente:\n");
    for turn in window {
        match turn.role {
            Role::User => {
                prompt.push_str("Usuario: ");
                prompt.push_str(&turn.text);
            }
            Role::Assistant => {
                prompt.push_str("Asistente: ");
                let excerpt: String = turn.text.chars().take(ASSISTANT_EXCERPT_CHARS).collect();
                prompt.push_str(&excerpt);
                if turn.text.chars().count() > ASSISTANT_EXCERPT_CHARS {
                    prompt.push('…');
                }
            }
        }
        prompt.push('\n');
    }
    prompt.push_str("\nConsulta actual: \"");
    prompt.push_str(utterance);
    prompt.push_str("\"\n\nConsulta reformulada:");
    prompt
}

/// Normalize the collaborator's rewrite into a usable query, or `None` when
/// there is nothing usable (which triggers the verbatim fallback).
fn extract_rewrite(raw: &str) -> Option<String> {
    // First non-empty line; models sometimes append explanations below.
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;

    let mut text = line.to_string();
    let lower = text.to_lowercase();
    for label in REWRITE_LABELS {
        if lower.starts_with(label) {
            text = text[label.len()..].trim().to_string();
            break;
        }
    }

    let text = text.trim_matches(|c| c == '"' || c == '“' || c == '”').trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGenerator;
    use fuente_core::error::GeneratorError;
    use fuente_core::generate::{GenerationOutput, StructuredMessage};

    fn config() -> ReformulationConfig {
        ReformulationConfig::default()
    }

    fn reformulator(generator: Arc<ScriptedGenerator>) -> QueryReformulator {
        QueryReformulator::new(generator, config(), "mock-model")
    }

    fn torta_history() -> Transcript {
        let mut t = Transcript::new();
        t.push(ConversationTurn::user("¿Cómo hago una torta de manzana?"));
        t.push(ConversationTurn::assistant(
            "Para una torta de manzana necesitas manzanas, harina, huevos y azúcar…",
        ));
        t
    }

    #[tokio::test]
    async fn empty_history_is_never_a_follow_up() {
        let generator = Arc::new(ScriptedGenerator::empty());
        let r = reformulator(generator.clone());

        let q = r.reformulate("¿Qué le puedo poner arriba?", &Transcript::new()).await;
        assert!(!q.is_follow_up);
        assert!(q.rewritten.is_none());
        assert_eq!(q.text(), "¿Qué le puedo poner arriba?");
        // The collaborator was never consulted
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn anaphoric_follow_up_is_rewritten_with_context() {
        let generator = Arc::new(ScriptedGenerator::text(
            "decoración para poner arriba de una torta de manzana",
        ));
        let r = reformulator(generator.clone());

        let q = r.reformulate("¿Qué le puedo poner arriba?", &torta_history()).await;
        assert!(q.is_follow_up);
        assert!(q.text().contains("torta de manzana"));
        assert!(q.text().contains("arriba"));

        // The rewrite prompt carried the prior topic from the window
        let request = generator.last_request().unwrap();
        assert!(request.prompt.contains("torta de manzana"));
        assert!(request.prompt.contains("¿Qué le puedo poner arriba?"));
    }

    #[tokio::test]
    async fn short_utterance_with_history_is_a_candidate() {
        let generator = Arc::new(ScriptedGenerator::text("más detalles sobre torta de manzana"));
        let r = reformulator(generator);

        let q = r.reformulate("cuéntame más", &torta_history()).await;
        assert!(q.is_follow_up);
    }

    #[tokio::test]
    async fn long_standalone_utterance_is_not_a_candidate() {
        let generator = Arc::new(ScriptedGenerator::empty());
        let r = reformulator(generator.clone());

        let q = r
            .reformulate(
                "receta completa del mejor gazpacho andaluz tradicional",
                &torta_history(),
            )
            .await;
        assert!(!q.is_follow_up);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn collaborator_failure_falls_back_to_original() {
        let generator = Arc::new(ScriptedGenerator::failing(GeneratorError::Timeout(
            "deadline exceeded".into(),
        )));
        let r = reformulator(generator);

        let q = r.reformulate("¿y con qué lo acompaño?", &torta_history()).await;
        // Degrades, never errors
        assert!(q.is_follow_up);
        assert!(q.rewritten.is_none());
        assert_eq!(q.text(), "¿y con qué lo acompaño?");
    }

    #[tokio::test]
    async fn empty_rewrite_falls_back_to_original() {
        let generator = Arc::new(ScriptedGenerator::text("   \n"));
        let r = reformulator(generator);

        let q = r.reformulate("¿y con qué lo acompaño?", &torta_history()).await;
        assert!(q.rewritten.is_none());
        assert_eq!(q.text(), "¿y con qué lo acompaño?");
    }

    #[tokio::test]
    async fn structured_output_is_normalized() {
        let generator = Arc::new(ScriptedGenerator::structured(StructuredMessage {
            role: Some("assistant".into()),
            content: "acompañamientos para torta de manzana".into(),
        }));
        let r = reformulator(generator);

        let q = r.reformulate("¿y con qué lo acompaño?", &torta_history()).await;
        assert_eq!(q.text(), "acompañamientos para torta de manzana");
    }

    #[tokio::test]
    async fn meta_flag_is_independent_of_follow_up() {
        let generator = Arc::new(ScriptedGenerator::text("resumen de la conversación"));
        let r = reformulator(generator);

        let q = r.reformulate("¿De qué hablamos antes?", &torta_history()).await;
        assert!(q.is_conversational_meta);
    }

    #[tokio::test]
    async fn meta_flag_without_history() {
        let generator = Arc::new(ScriptedGenerator::empty());
        let r = reformulator(generator);

        let q = r.reformulate("¿De qué hablamos antes?", &Transcript::new()).await;
        assert!(q.is_conversational_meta);
        assert!(!q.is_follow_up);
    }

    #[tokio::test]
    async fn disabled_reformulation_skips_the_collaborator() {
        let generator = Arc::new(ScriptedGenerator::empty());
        let mut cfg = config();
        cfg.enabled = false;
        let r = QueryReformulator::new(generator.clone(), cfg, "mock-model");

        let q = r.reformulate("¿y con qué lo acompaño?", &torta_history()).await;
        assert!(!q.is_follow_up);
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn extract_rewrite_strips_quotes_and_labels() {
        assert_eq!(
            extract_rewrite("\"con qué acompañar puré de papas\""),
            Some("con qué acompañar puré de papas".into())
        );
        assert_eq!(
            extract_rewrite("Consulta reformulada: torta de manzana decoración"),
            Some("torta de manzana decoración".into())
        );
        assert_eq!(extract_rewrite("  \n \n"), None);
    }

    #[test]
    fn extract_rewrite_takes_first_line() {
        let raw = "decoración de torta de manzana\n\nNota: reformulé la consulta.";
        assert_eq!(
            extract_rewrite(raw),
            Some("decoración de torta de manzana".into())
        );
    }

    #[test]
    fn rewrite_prompt_excerpts_long_assistant_turns() {
        let mut history = Transcript::new();
        history.push(ConversationTurn::user("receta de torta"));
        history.push(ConversationTurn::assistant("x".repeat(500)));

        let prompt = build_rewrite_prompt(history.last_window(3), "¿y arriba?");
        // 200 chars of excerpt plus the ellipsis, not the full 500
        assert!(prompt.contains(&"x".repeat(200)));
        assert!(!prompt.contains(&"x".repeat(201)));
        assert!(prompt.contains('…'));
    }

    #[test]
    fn anaphora_regex_matches_word_boundaries_only() {
        let re = build_anaphora_regex(&["lo".into(), "it".into()]);
        assert!(re.is_match("¿con qué lo acompaño?"));
        assert!(re.is_match("what about it?"));
        // "lo" inside a longer word must not match
        assert!(!re.is_match("los logros del año"));
    }
}
