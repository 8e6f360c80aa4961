//! Code Coach CLI: the main entry point.
//!
//! Commands:
//! - `serve` - Start the HTTP relay
//! - `chat` - Ask the coach from the terminal (single message or interactive)
//! - `doctor` - Diagnose configuration and upstream reachability
//! - `config` - Print the effective configuration (secrets redacted)

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "codecoach",
    about = "Code Coach: AI tutoring relay for Swift learners",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Path to a config file (default: ~/.codecoach/config.toml)
    #[arg(short, long, global = true, env = "CODECOACH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP relay server
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the coach from the terminal
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Current lesson, passed as context
        #[arg(short, long)]
        lesson: Option<String>,
    },

    /// Diagnose configuration and upstream reachability
    Doctor,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A local .env file is optional
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(config_path, host, port).await?,
        Commands::Chat { message, lesson } => {
            commands::chat::run(config_path, message, lesson).await?
        }
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Config => commands::config_cmd::run(config_path)?,
    }

    Ok(())
}
