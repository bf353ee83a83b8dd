//! CLI configuration inspection
//!
//! Provides `parley config {show,get}` for viewing the effective settings.

use crate::server::config::AppConfig;
use crate::server::load_config;
use anyhow::{Context, Result};
use clap::Subcommand;
use parley_llm::util::mask_api_key;

/// Environment variables holding secrets
const SECRET_VARS: &[&str] = &["TELEGRAM_BOT_TOKEN", "OPENAI_API_KEY", "OPENAI_ORG_ID"];

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (default)
    Show,
    /// Print a single setting
    Get {
        /// Setting key (dot notation: session.context_window)
        key: String,
    },
}

pub fn run(cmd: Option<ConfigCommands>) -> Result<()> {
    let config = load_config()?;
    match cmd.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => cmd_show(&config),
        ConfigCommands::Get { key } => cmd_get(&config, &key),
    }
}

fn cmd_show(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", rendered.trim_end());
    println!();
    println!("# Secrets (environment)");
    for var in SECRET_VARS {
        println!("# {:<20} {}", var, secret_status(std::env::var(var).ok().as_deref()));
    }
    Ok(())
}

fn secret_status(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => mask_api_key(v),
        _ => "(not set)".to_string(),
    }
}

fn cmd_get(config: &AppConfig, key: &str) -> Result<()> {
    let value = lookup(config, key)?.with_context(|| format!("Key not found: {}", key))?;
    match value {
        serde_json::Value::String(s) => println!("{}", s),
        other => println!("{}", other),
    }
    Ok(())
}

fn lookup(config: &AppConfig, key: &str) -> Result<Option<serde_json::Value>> {
    let root = serde_json::to_value(config).context("Failed to serialize config")?;
    Ok(key
        .split('.')
        .try_fold(&root, |node, part| node.get(part))
        .cloned())
}
