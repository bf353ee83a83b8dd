//! Bot initialization and main run loop

use super::loader::load_config;
use anyhow::{Context, Result};
use parley_channels::{TelegramAdapter, TelegramConfig};
use parley_core::{AccessGate, Relay, SessionStore};
use parley_llm::{LlmProvider, OpenAiConfig, OpenAiProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Run the bot until interrupted
pub async fn run() -> Result<()> {
    info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    let openai_config = OpenAiConfig::from_env()
        .context("Failed to configure completion provider")?
        .with_model(config.llm.default_model.clone())
        .with_timeout(config.llm.timeout());
    let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(openai_config));
    info!(provider = provider.name(), model = provider.default_model(), "Completion provider ready");
    if !provider.supports_model(provider.default_model()) {
        warn!(model = provider.default_model(), known = ?provider.available_models(), "Default model is not a known chat model");
    }

    let telegram_config = TelegramConfig::from_env(&config.telegram.allowed_users_file)
        .context("Failed to configure Telegram")?;

    let gate = AccessGate::from_file(&telegram_config.allowed_users_file)
        .await
        .with_context(|| {
            format!(
                "Failed to load allow-list from {}",
                telegram_config.allowed_users_file.display()
            )
        })?;

    let store = SessionStore::in_memory(config.session_config());
    info!(
        history_budget = store.config().history_budget(),
        "Session store ready"
    );

    let adapter = Arc::new(TelegramAdapter::new(telegram_config));
    let bot_username = adapter
        .bot_username()
        .await
        .context("Failed to fetch bot identity")?;
    info!(username = %bot_username, "Connected to Telegram");

    let relay = Relay::new(Arc::new(store), Arc::new(gate), provider)
        .with_bot_username(bot_username)
        .with_timeout(config.llm.timeout());

    adapter.run(Arc::new(relay)).await?;

    info!("Parley stopped");
    Ok(())
}
