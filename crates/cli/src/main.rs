//! Fuente CLI — the main entry point.
//!
//! Commands:
//! - `init`   — Initialize config
//! - `chat`   — Interactive chat or single-message mode
//! - `serve`  — Start the HTTP gateway

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "fuente",
    about = "Fuente — a conversational assistant that answers with cited web sources",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the configuration file
    Init,

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Session id to continue (defaults to a fresh session)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Chat { message, session } => commands::chat::run(message, session).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
    }

    Ok(())
}
