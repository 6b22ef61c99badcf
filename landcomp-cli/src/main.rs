//! LandComp CLI — Terminal interface for the LandComp landscape assistant.
//!
//! Provides a one-shot ask mode and an interactive chat REPL.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// LandComp: specialist garden, landscape, construction, and ecology assistants
#[derive(Parser, Debug)]
#[command(name = "landcomp", version, about, long_about = None)]
struct Cli {
    /// Question to ask (starts interactive chat if omitted)
    message: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Language code for replies and prompts (e.g. en, ru)
    #[arg(short, long)]
    language: Option<String>,

    /// Session identifier for conversation history
    #[arg(short, long, default_value = "default")]
    session: String,

    /// Answer from a scripted offline provider instead of real APIs
    #[arg(long)]
    offline: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Interactive chat loop
    Chat,
    /// List personas and their quick-start suggestions
    Personas,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Print the resolved configuration as JSON
    Show,
    /// Print the default configuration file path
    Path,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_filter = match (quiet, verbose) {
        (true, _) => "landcomp=error",
        (false, 0) => "landcomp=warn",
        (false, 1) => "landcomp=info",
        (false, _) => "landcomp=debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up provider keys from a .env file when present.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Some(Commands::Personas) => commands::run_personas(&cli.config, cli.language.as_deref()),
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => commands::run_config_show(&cli.config),
            ConfigAction::Path => commands::run_config_path(),
        },
        Some(Commands::Chat) => {
            commands::run_chat(
                &cli.config,
                cli.language.as_deref(),
                &cli.session,
                cli.offline,
            )
            .await
        }
        None => match &cli.message {
            Some(message) => {
                commands::run_ask(
                    message,
                    &cli.config,
                    cli.language.as_deref(),
                    &cli.session,
                    cli.offline,
                )
                .await
            }
            None => {
                commands::run_chat(
                    &cli.config,
                    cli.language.as_deref(),
                    &cli.session,
                    cli.offline,
                )
                .await
            }
        },
    }
}
