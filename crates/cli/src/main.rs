//! CRMPilot CLI — the main entry point.
//!
//! Commands:
//! - `init`          — Write a starter config file
//! - `chat`          — Interactive chat with the CRM assistant
//! - `doctor`        — Diagnose configuration and connectivity
//! - `clear-history` — Forget a user's conversation history

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "crmpilot",
    about = "CRMPilot — conversational CRM assistant",
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
    /// Write a starter configuration file
    Init,

    /// Chat with the CRM assistant
    Chat {
        /// Conversation identity; history is kept per user
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Diagnose configuration and CRM connectivity
    Doctor,

    /// Forget a user's conversation history
    ClearHistory {
        /// The user identity to clear
        user: String,
    },
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
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await,
        Commands::Chat { user, message } => commands::chat::run(&user, message).await,
        Commands::Doctor => commands::doctor::run().await,
        Commands::ClearHistory { user } => commands::clear_history::run(&user).await,
    }
}
