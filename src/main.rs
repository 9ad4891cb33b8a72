//! chatbridge binary entry point

use std::{sync::Arc, time::Duration};

use chatbridge::{
    cli::{Cli, Commands},
    config::{Config, LocalModelSettings},
    messages::ResponseEnvelope,
    registry::ModelRegistry,
    services::{ChatBot, ChatTransport, HttpTransport},
    storage::{JsonFileStore, SettingsStore},
};
use color_eyre::{eyre::eyre, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // Install error handler
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("chatbridge=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let config = Config::new(cli.store.clone());
    let store: Arc<JsonFileStore> = Arc::new(config.open_store());

    match cli.command {
        Some(Commands::Chat { bot, prompt }) => {
            let transport: Arc<dyn ChatTransport> = Arc::new(match cli.timeout {
                Some(secs) => HttpTransport::with_timeout(Duration::from_secs(secs))?,
                None => HttpTransport::new()?,
            });
            chat(store, transport, bot, prompt).await?;
        }
        Some(Commands::Settings { endpoint, model }) => {
            let mut settings = LocalModelSettings::load(store.as_ref()).await?;
            if endpoint.is_none() && model.is_none() {
                println!("endpoint: {}", settings.endpoint_url);
                println!("model:    {}", settings.model_name);
            } else {
                if let Some(endpoint) = endpoint {
                    settings.endpoint_url = endpoint;
                }
                if let Some(model) = model {
                    settings.model_name = model;
                }
                settings.submit(store.as_ref()).await?;
                println!("Settings saved to {}", store.path().display());
            }
        }
        Some(Commands::Models { list, activate }) => {
            let mut registry = ModelRegistry::new();
            registry.restore_active_keys(store.as_ref()).await?;

            if !activate.is_empty() {
                registry.set_active(&activate)?;
                registry.save_active_keys(store.as_ref()).await?;
                println!("Active: {}", registry.active_keys().join(", "));
            }

            if list || activate.is_empty() {
                for category in registry.categories() {
                    println!("{}", category.label);
                    for model in &category.models {
                        let marker = if registry.is_active(model.name()) { "*" } else { " " };
                        println!(
                            " {marker} {} (max tokens {})",
                            model.name(),
                            model.info.max_token_limit
                        );
                    }
                }
            }
        }
        Some(Commands::Version) => {
            println!("chatbridge version {}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            println!("Use --help for more information");
        }
    }

    Ok(())
}

/// Run a one-shot prompt or a line-based session on stdin
async fn chat(
    store: Arc<JsonFileStore>,
    transport: Arc<dyn ChatTransport>,
    bot_name: Option<String>,
    prompt: Option<String>,
) -> Result<()> {
    let mut registry = ModelRegistry::new();
    registry.restore_active_keys(store.as_ref()).await?;

    let name = match bot_name {
        Some(name) => name,
        None => registry
            .active()
            .first()
            .map(|d| d.name().to_string())
            .ok_or_else(|| eyre!("no active bot"))?,
    };
    let store: Arc<dyn SettingsStore> = store;
    let mut bot = registry.create(&name, store, transport)?;

    if let Some(prompt) = prompt {
        if !send(bot.as_mut(), &prompt).await {
            return Err(eyre!("completion failed"));
        }
        return Ok(());
    }

    eprintln!("Chatting with {name}. /clear resets the conversation, /exit quits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                bot.clear_history();
                eprintln!("History cleared.");
            }
            _ => {
                send(bot.as_mut(), line).await;
            }
        }
    }

    Ok(())
}

/// Send one prompt and print the result; returns whether it succeeded
async fn send(bot: &mut dyn ChatBot, prompt: &str) -> bool {
    let request_id = Uuid::new_v4().to_string();
    let mut ok = false;
    bot.completion(prompt, &request_id, &mut |_rid: &str, envelope: ResponseEnvelope| match envelope {
        ResponseEnvelope::Generating { .. } => {}
        ResponseEnvelope::Done { message_text } => {
            println!("{message_text}");
            ok = true;
        }
        ResponseEnvelope::Error { error } => eprintln!("error: {error}"),
    })
    .await;
    ok
}
