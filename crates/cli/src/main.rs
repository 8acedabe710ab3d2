//! Chatwright CLI: the main entry point.
//!
//! Commands:
//! - `reply`     Generate one reply for a profile and message
//! - `knowledge` Preview a profile's compiled knowledge
//! - `gateway`   Start the HTTP gateway
//! - `config`    Show, locate or validate the configuration

use chatwright_core::profile::Platform;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "chatwright",
    about = "Chatwright: knowledge-grounded replies for multi-platform chatbots",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "CHATWRIGHT_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a single reply
    Reply {
        /// Bot profile snapshot (JSON)
        #[arg(short, long)]
        profile: PathBuf,

        /// The user's message
        #[arg(short, long)]
        message: String,

        /// Platform the reply is formatted for
        #[arg(long, default_value = "web")]
        platform: Platform,

        /// Print the full result (tier, language, market data) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Preview the compiled knowledge for a profile
    Knowledge {
        /// Bot profile snapshot (JSON)
        #[arg(short, long)]
        profile: PathBuf,

        /// Character budget to truncate to
        #[arg(long)]
        max_length: Option<usize>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets omitted)
    Show,
    /// Print the config file location
    Path,
    /// Parse and validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `reply` and `knowledge` output stays pipeable
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Reply {
            profile,
            message,
            platform,
            json,
        } => commands::reply::run(&profile, &message, platform, json).await?,
        Commands::Knowledge {
            profile,
            max_length,
        } => commands::knowledge::run(&profile, max_length)?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Validate => commands::config_cmd::validate()?,
        },
    }

    Ok(())
}
