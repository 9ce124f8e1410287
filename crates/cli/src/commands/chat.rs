//! `fuente chat` — Interactive or single-message chat mode.

use std::sync::Arc;

use fuente_config::AppConfig;
use fuente_core::source::CitationSet;
use fuente_core::turn::SessionId;
use fuente_engine::ChatEngine;
use fuente_providers::{GoogleSearchProvider, HttpPageFetcher, OpenAiCompatGenerator};
use tokio::io::{self, AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for the generation key early — give a clear error
    if !config.has_generation_key() {
        eprintln!();
        eprintln!("  ERROR: No generation API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY = 'sk-...'");
        eprintln!("    FUENTE_API_KEY = 'sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let engine = build_engine(&config)?;
    let session_id = session
        .map(|s| SessionId::from(&s))
        .unwrap_or_default();

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Pensando...");
        let outcome = engine.respond(&session_id, &msg).await;
        eprint!("\r            \r");
        println!("{}", outcome.answer);
        print_sources(&outcome.citations);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Fuente — Interactive Chat");
    println!();
    println!("  Model:      {}", config.generation.model);
    println!(
        "  Web search: {}",
        if config.has_search_credentials() {
            "configured"
        } else {
            "not configured"
        }
    );
    println!("  Session:    {session_id}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'salir' or 'exit' to quit.");
    println!();

    let stdin = io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    print_prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            print_prompt()?;
            continue;
        }
        if matches!(line, "salir" | "exit" | "quit" | "/exit" | "/quit") {
            println!("  ¡Hasta luego!");
            break;
        }

        eprint!("  Pensando...");
        let outcome = engine.respond(&session_id, line).await;
        eprint!("\r            \r");

        println!();
        println!("{}", outcome.answer);
        print_sources(&outcome.citations);
        if outcome.degraded {
            println!("  (respuesta sin resultados de búsqueda)");
        }
        println!();
        print_prompt()?;
    }

    Ok(())
}

fn build_engine(config: &AppConfig) -> Result<Arc<ChatEngine>, Box<dyn std::error::Error>> {
    let generator = Arc::new(OpenAiCompatGenerator::from_config(&config.generation)?);

    let search = GoogleSearchProvider::from_config(&config.search)
        .map(|s| Arc::new(s) as Arc<dyn fuente_core::SearchProvider>);

    let fetcher = HttpPageFetcher::from_config(&config.fetch)
        .ok()
        .map(|f| Arc::new(f) as Arc<dyn fuente_core::PageFetcher>);

    let store = fuente_session::from_config(&config.session);

    Ok(Arc::new(ChatEngine::new(
        generator, search, fetcher, store, config,
    )))
}

fn print_sources(citations: &CitationSet) {
    if citations.is_empty() {
        return;
    }
    println!();
    println!("  Fuentes consultadas:");
    for scored in &citations.sources {
        println!("  - {}", scored.source.title);
        println!("    {}", scored.source.url);
    }
}

fn print_prompt() -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;
    print!("  Tú > ");
    std::io::stdout().flush()?;
    Ok(())
}
