//! Pawline CLI, the main entry point.
//!
//! Commands:
//! - `onboard`    Write a default config
//! - `scheduler`  Run the scheduling tool provider
//! - `ask`        Answer one question for a session
//! - `chat`       Interactive session
//! - `tools`      Show the tool provider's catalog
//! - `ingest`     Validate and preview a dog-record seed file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "pawline",
    about = "Pawline: dog adoption assistant with grounded answers and appointment scheduling",
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
    /// Write ~/.pawline/config.toml with defaults
    Onboard,

    /// Run the scheduling tool provider
    Scheduler {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask one question
    Ask {
        /// Conversation to continue (e.g. a username)
        #[arg(short, long)]
        session: String,

        /// The question text
        question: String,
    },

    /// Chat interactively
    Chat {
        /// Conversation to continue (e.g. a username)
        #[arg(short, long)]
        session: String,
    },

    /// Connect to the tool provider and list its tools
    Tools,

    /// Validate a dog-record seed file and preview its documents
    Ingest {
        /// JSON array of {id, name, description}
        file: PathBuf,

        /// Run a sample lookup against the file
        #[arg(short, long)]
        query: Option<String>,
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
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Scheduler { port } => commands::scheduler::run(port).await?,
        Commands::Ask { session, question } => commands::ask::run(session, question).await?,
        Commands::Chat { session } => commands::chat::run(session).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Ingest { file, query } => commands::ingest::run(file, query).await?,
    }

    Ok(())
}
