//! JTRADE responder CLI — the main entry point.
//!
//! Commands:
//! - `onboard`    — Write the default config, knowledge base and directories
//! - `create-kb`  — Write a knowledge base document from named sources
//! - `index`      — Rebuild the embedding index
//! - `search`     — Rank knowledge entries against a query
//! - `intent`     — Classify a message
//! - `persona`    — Show the resolved persona for an account
//! - `prompt`     — Show the prompt that would be sent for a message
//! - `ask`        — Produce a reply for a message
//! - `cache`      — Response cache statistics and cleanup

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "responder",
    about = "JTRADE auto-responder — knowledge retrieval and prompt assembly",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.jtrade-responder/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration, knowledge base and data directories
    Onboard,

    /// Write a knowledge base document
    CreateKb {
        /// Base name; the file is written as <knowledge dir>/<name>.json
        #[arg(short, long, default_value = "general")]
        name: String,

        /// Sources to include (defaults to all)
        #[arg(short, long, value_delimiter = ',')]
        sources: Vec<String>,

        /// Read sources from the JSON files of this directory instead of the
        /// built-in JTRADE data
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Rebuild the embedding index from the knowledge directory
    Index,

    /// Rank knowledge entries against a query
    Search {
        query: String,

        /// Number of results
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
    },

    /// Classify a message into intents
    Intent { message: String },

    /// Show the resolved persona for an account
    Persona { identity: String },

    /// Show the assembled prompt for a message without calling the provider
    Prompt {
        message: String,

        #[command(flatten)]
        conversation: commands::ConversationArgs,
    },

    /// Produce a reply for a message
    Ask {
        message: String,

        #[command(flatten)]
        conversation: commands::ConversationArgs,
    },

    /// Response cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry count and total uses
    Stats,

    /// Delete entries unused for longer than the retention window
    Clean {
        /// Override cache.retention_days
        #[arg(long)]
        days: Option<u32>,
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

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Onboard => commands::onboard::run(config_path).await?,
        Commands::CreateKb { name, sources, from } => {
            commands::knowledge::create_kb(config_path, &name, &sources, from.as_deref()).await?
        }
        Commands::Index => commands::knowledge::index(config_path).await?,
        Commands::Search { query, top_k } => {
            commands::knowledge::search(config_path, &query, top_k).await?
        }
        Commands::Intent { message } => commands::inspect::intent(&message)?,
        Commands::Persona { identity } => commands::inspect::persona(config_path, &identity)?,
        Commands::Prompt {
            message,
            conversation,
        } => commands::inspect::prompt(config_path, &conversation, &message).await?,
        Commands::Ask {
            message,
            conversation,
        } => commands::ask::run(config_path, &conversation, &message).await?,
        Commands::Cache { action } => match action {
            CacheAction::Stats => commands::cache::stats(config_path).await?,
            CacheAction::Clean { days } => commands::cache::clean(config_path, days).await?,
        },
    }

    Ok(())
}
