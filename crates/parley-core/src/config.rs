//! Session configuration
//!
//! Deserialized from the `[session]` table of the application config.

use crate::settings::{UserSettings, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use serde::{Deserialize, Serialize};

/// Context window assumed for every model
pub const DEFAULT_CONTEXT_WINDOW: usize = 4096;

/// Tokens held back from the history budget so the model has room to answer
pub const DEFAULT_RESERVED_RESPONSE_TOKENS: usize = 1500;

/// Persona used when a user has not set a custom context
pub const DEFAULT_PERSONA: &str = "You are a friendly and informal assistant.";

/// Per-session defaults and history budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Model context window, in approximate tokens
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Tokens reserved for the completion
    #[serde(default = "default_reserved_response_tokens")]
    pub reserved_response_tokens: usize,
    /// Model for new sessions
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Temperature for new sessions
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    /// Completion token cap for new sessions
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    /// System persona for sessions without a custom context
    #[serde(default = "default_persona")]
    pub default_persona: String,
}

fn default_context_window() -> usize {
    DEFAULT_CONTEXT_WINDOW
}

fn default_reserved_response_tokens() -> usize {
    DEFAULT_RESERVED_RESPONSE_TOKENS
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            reserved_response_tokens: default_reserved_response_tokens(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            default_persona: default_persona(),
        }
    }
}

impl SessionConfig {
    /// Token budget available to history: `context_window - reserved_response_tokens`
    #[must_use]
    pub fn history_budget(&self) -> usize {
        self.context_window
            .saturating_sub(self.reserved_response_tokens)
    }

    /// Settings a new session starts with
    #[must_use]
    pub fn default_settings(&self) -> UserSettings {
        UserSettings {
            model: self.default_model.clone(),
            temperature: self.default_temperature,
            max_tokens: self.default_max_tokens,
        }
    }
}
