//! Telegram configuration types

use crate::error::{Error, Result};
use parley_llm::util::mask_api_key;
use std::fmt;
use std::path::PathBuf;

/// Default allow-list location
pub const DEFAULT_ALLOWED_USERS_FILE: &str = "allowed_users.txt";

/// Telegram bot configuration
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token
    pub bot_token: String,
    /// Newline-delimited file of user ids allowed in private chats
    pub allowed_users_file: PathBuf,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &mask_api_key(&self.bot_token))
            .field("allowed_users_file", &self.allowed_users_file)
            .finish()
    }
}

impl TelegramConfig {
    /// Create from environment variables
    ///
    /// Reads `TELEGRAM_BOT_TOKEN` (required) and `TELEGRAM_ALLOWED_USERS_FILE`.
    /// When the file variable is unset, `fallback_file` is used.
    pub fn from_env(fallback_file: impl Into<PathBuf>) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), fallback_file)
    }

    /// Same as [`Self::from_env`] with variables read through `lookup`
    pub fn from_lookup<F>(lookup: F, fallback_file: impl Into<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Config("TELEGRAM_BOT_TOKEN not set".to_string()))?;

        let allowed_users_file = lookup("TELEGRAM_ALLOWED_USERS_FILE")
            .filter(|p| !p.trim().is_empty())
            .map_or_else(|| fallback_file.into(), PathBuf::from);

        Ok(Self::new(bot_token).with_allowed_users_file(allowed_users_file))
    }

    /// Create with a bot token
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            allowed_users_file: PathBuf::from(DEFAULT_ALLOWED_USERS_FILE),
        }
    }

    /// Set the allow-list file
    #[must_use]
    pub fn with_allowed_users_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.allowed_users_file = path.into();
        self
    }
}
