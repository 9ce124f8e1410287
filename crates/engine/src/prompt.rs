//! Answer prompt assembly.
//!
//! Builds the system prompt and the user-facing prompt (query plus the web
//! context block derived from the citation set). The assembler is thin by
//! design — the answer's substance is the generation collaborator's job.

use fuente_core::query::EffectiveQuery;
use fuente_core::source::CitationSet;

/// System prompt for answer generation.
pub const ANSWER_SYSTEM_PROMPT: &str = "\
Eres un asistente conversacional que proporciona respuestas concisas, directas y útiles.

Directrices:
1. Mantén tus respuestas breves y al punto, en máximo 2-3 párrafos cortos.
2. Integra naturalmente la información del contexto web en tus respuestas.
3. Menciona una fuente solo cuando añada valor real (ej: \"Según [fuente], …\").
4. Si la información de las fuentes no es relevante para la consulta, no las menciones.
5. No añadas una sección de fuentes o enlaces al final: el sistema las muestra aparte.

Si el usuario pregunta sobre la conversación anterior (\"¿de qué hablamos?\"):
- Ignora los resultados de búsqueda web aunque se te proporcionen.
- Responde directamente a partir del historial de conversación.";

/// Build the prompt for the answer request: the effective query plus the
/// formatted web context, when there is any.
pub fn build_answer_prompt(query: &EffectiveQuery, citations: &CitationSet) -> String {
    let mut prompt = query.original.clone();

    if query.is_follow_up && query.rewritten.is_some() {
        // Let the model see the resolved reading of the follow-up too.
        prompt.push_str("\n(Interpretación en contexto: ");
        prompt.push_str(query.text());
        prompt.push(')');
    }

    let context = format_web_context(citations);
    if !context.is_empty() {
        prompt.push_str("\n\nContexto de la web:\n");
        prompt.push_str(&context);
    }

    prompt
}

/// Format the citation set as the context block the generator sees:
/// one `Fuente / Información / URL` stanza per citation.
pub fn format_web_context(citations: &CitationSet) -> String {
    let mut blocks = Vec::with_capacity(citations.len());
    for scored in &citations.sources {
        let source = &scored.source;
        let info = source
            .page_content
            .as_deref()
            .unwrap_or(source.snippet.as_str());
        blocks.push(format!(
            "Fuente: {}\nInformación: {}\nURL: {}",
            source.title, info, source.url
        ));
    }
    blocks.join("\n\n")
}
