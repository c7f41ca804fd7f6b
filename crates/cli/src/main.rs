//! rolelog CLI: the main entry point.
//!
//! Commands:
//! - `serve`    Start the mock chat-completions server
//! - `format`   Run the transcript pipeline on a saved request
//! - `onboard`  Initialize config & logs directory
//! - `doctor`   Diagnose setup

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "rolelog",
    about = "rolelog: per-character transcript logs for roleplay chat clients",
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
    /// Start the mock OpenAI-compatible server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the log directory
        #[arg(long)]
        logs_dir: Option<PathBuf>,
    },

    /// Print the resolved characters and transcript for a JSON request file
    Format {
        /// File holding a messages array or a request body with `messages`
        file: PathBuf,

        /// Also write the transcript to the log directory
        #[arg(long)]
        log: bool,
    },

    /// Initialize configuration and the log directory
    Onboard,

    /// Diagnose configuration and log directory
    Doctor,
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
        Commands::Serve { port, logs_dir } => commands::serve::run(port, logs_dir).await?,
        Commands::Format { file, log } => commands::format::run(&file, log).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
