//! Server configuration types

use parley_core::SessionConfig;
use parley_llm::openai::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Session defaults, with the model taken from `[llm]`
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            default_model: self.llm.default_model.clone(),
            ..self.session.clone()
        }
    }
}

/// Telegram channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSection {
    #[serde(default = "default_allowed_users_file")]
    pub allowed_users_file: String,
}

fn default_allowed_users_file() -> String {
    parley_channels::telegram::DEFAULT_ALLOWED_USERS_FILE.to_string()
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            allowed_users_file: default_allowed_users_file(),
        }
    }
}

/// Completion service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::loader::DEFAULT_CONFIG;

    #[test]
    fn test_embedded_defaults_parse() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();

        assert_eq!(config.telegram.allowed_users_file, "allowed_users.txt");
        assert_eq!(config.llm.default_model, "gpt-3.5-turbo");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.session.history_budget(), 4096 - 1500);
        assert_eq!(config.llm.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_session_model_follows_llm_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [llm]
            default_model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        assert_eq!(config.session_config().default_model, "gpt-4o-mini");
        assert_eq!(config.session_config().default_settings().model, "gpt-4o-mini");
    }
}
