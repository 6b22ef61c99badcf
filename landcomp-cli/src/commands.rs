//! Command implementations for the LandComp CLI.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use landcomp_core::dispatch::ProviderSlot;
use landcomp_core::providers::{ChatProvider, MockChatProvider};
use landcomp_core::session::{FileSessionStore, InMemorySessionStore, SessionStore};
use landcomp_core::{config, AppConfig, DispatchClient, Orchestrator};

/// Load configuration and surface validation warnings.
fn load_config(config_file: &Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = config::load_config(config_file.as_ref()).context("failed to load config")?;
    for warning in config.validate() {
        tracing::warn!("config: {}", warning);
    }
    Ok(config)
}

fn session_store(config: &AppConfig) -> Arc<dyn SessionStore> {
    match &config.session_dir {
        Some(dir) => Arc::new(FileSessionStore::new(dir.clone())),
        None => Arc::new(InMemorySessionStore::new()),
    }
}

/// Build the orchestrator, substituting a scripted provider in offline mode.
fn build_orchestrator(config: AppConfig, offline: bool) -> anyhow::Result<Orchestrator> {
    let store = session_store(&config);
    if offline {
        let mock: Arc<dyn ChatProvider> = Arc::new(MockChatProvider::with_response(
            "(offline) I would answer that based on the selected persona.",
        ));
        let dispatch = DispatchClient::with_providers(
            vec![ProviderSlot {
                name: "offline".to_string(),
                keyed_clients: vec![mock],
            }],
            Duration::from_secs(config.request_timeout_secs),
        );
        return Ok(Orchestrator::with_dispatch(config, dispatch, store));
    }
    Orchestrator::new(config, store).context("failed to initialize orchestrator")
}

fn resolve_language(config: &AppConfig, language: Option<&str>) -> String {
    language
        .map(str::to_string)
        .unwrap_or_else(|| config.default_language.clone())
}

/// One-shot question: print the answer and the persona that produced it.
pub async fn run_ask(
    message: &str,
    config_file: &Option<PathBuf>,
    language: Option<&str>,
    session: &str,
    offline: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_file)?;
    let language = resolve_language(&config, language);
    let orchestrator = build_orchestrator(config, offline)?;

    let reply = orchestrator
        .process_message(
            message,
            Vec::new(),
            session,
            &language,
            None,
            &CancellationToken::new(),
        )
        .await?;

    if let Some(persona) = reply.persona {
        let name = orchestrator
            .catalog()
            .get(persona)
            .map(|p| p.display_name(&language, "en").to_string())
            .unwrap_or_else(|| persona.to_string());
        println!("[{}] {}", name, reply.text);
    } else {
        println!("{}", reply.text);
    }
    Ok(())
}

/// Interactive chat loop over stdin.
pub async fn run_chat(
    config_file: &Option<PathBuf>,
    language: Option<&str>,
    session: &str,
    offline: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_file)?;
    let language = resolve_language(&config, language);
    let orchestrator = build_orchestrator(config, offline)?;

    println!("LandComp chat — empty line or Ctrl-D to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            break;
        }

        match orchestrator
            .process_message(
                message,
                Vec::new(),
                session,
                &language,
                None,
                &CancellationToken::new(),
            )
            .await
        {
            Ok(reply) => {
                let speaker = reply
                    .persona
                    .and_then(|id| orchestrator.catalog().get(id))
                    .map(|p| p.display_name(&language, "en").to_string())
                    .unwrap_or_else(|| "LandComp".to_string());
                println!("{}: {}", speaker, reply.text);
            }
            Err(e) => {
                tracing::error!(error = %e, "Message processing failed");
                println!("Error: {}", e);
            }
        }
    }

    println!("Bye.");
    Ok(())
}

/// List personas with their localized quick-start suggestions.
pub fn run_personas(
    config_file: &Option<PathBuf>,
    language: Option<&str>,
) -> anyhow::Result<()> {
    let config = load_config(config_file)?;
    let language = resolve_language(&config, language);
    let catalog = landcomp_core::PersonaCatalog::builtin();

    for persona in catalog.active_personas() {
        println!(
            "{} ({})",
            persona.display_name(&language, "en"),
            persona.id
        );
        for suggestion in persona.suggestions(&language, "en") {
            println!("  - {}", suggestion);
        }
    }
    Ok(())
}

/// Print the resolved configuration as pretty JSON.
pub fn run_config_show(config_file: &Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_file)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Print the default configuration file path.
pub fn run_config_path() -> anyhow::Result<()> {
    match config::default_config_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("No default config directory available on this platform."),
    }
    Ok(())
}
