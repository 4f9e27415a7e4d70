//! llmbind CLI: model-backed assistants from the command line.
//!
//! Commands:
//! - `chat`: Memory-aware chat with the calculator tools
//! - `extract`: Pull a typed value (number, date, time, person) out of text
//! - `ask`: Answer a question from a directory of documents
//! - `config`: Show, locate, or initialize the configuration file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::extract::ExtractKind;

#[derive(Parser)]
#[command(
    name = "llmbind",
    about = "llmbind: typed assistants backed by a language model",
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
    /// Chat with an assistant that remembers the conversation
    Chat {
        /// Conversation to continue
        #[arg(short, long, default_value = "default")]
        session: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Extract a typed value from free text
    Extract {
        #[arg(value_enum)]
        kind: ExtractKind,

        text: String,
    },

    /// Answer a question using documents as context
    Ask {
        /// Directory of .txt and .md files
        #[arg(short, long)]
        docs: PathBuf,

        question: String,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { session, message } => commands::chat::run(&session, message).await?,
        Commands::Extract { kind, text } => commands::extract::run(kind, &text).await?,
        Commands::Ask { docs, question } => commands::ask::run(&docs, &question).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Init => commands::config_cmd::init()?,
        },
    }

    Ok(())
}
