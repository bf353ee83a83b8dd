//! Per-user generation settings
//!
//! Settings are only changed through [`SettingUpdate`], which is built by
//! parsing command arguments. A value that fails to parse never reaches
//! [`UserSettings::apply`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Baseline completion model
pub const DEFAULT_MODEL: &str = parley_llm::openai::DEFAULT_MODEL;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default completion token cap
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Generation settings for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Completion model identifier
    pub model: String,
    /// Sampling temperature, conventionally within [0.0, 1.0]
    pub temperature: f32,
    /// Cap on generated tokens
    pub max_tokens: u32,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl UserSettings {
    /// Apply a validated update
    pub fn apply(&mut self, update: SettingUpdate) {
        match update {
            SettingUpdate::Model(model) => self.model = model,
            SettingUpdate::Temperature(temperature) => self.temperature = temperature,
            SettingUpdate::MaxTokens(max_tokens) => self.max_tokens = max_tokens,
        }
    }
}

impl fmt::Display for UserSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Current settings:\nModel: {}\nTemperature: {}\nMax tokens: {}",
            self.model, self.temperature, self.max_tokens
        )
    }
}

/// Rejected setting argument
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    /// No argument was given
    #[error("missing value")]
    Missing,
    /// The argument has the wrong type or is out of range
    #[error("invalid value: {0:?}")]
    Invalid(String),
}

/// A single validated change to [`UserSettings`]
#[derive(Debug, Clone, PartialEq)]
pub enum SettingUpdate {
    /// Change the model
    Model(String),
    /// Change the temperature
    Temperature(f32),
    /// Change the completion token cap
    MaxTokens(u32),
}

fn first_arg(args: &str) -> Result<&str, SettingError> {
    args.split_whitespace().next().ok_or(SettingError::Missing)
}

impl SettingUpdate {
    /// Parse `/setmodel` arguments: the first token is the model name
    pub fn parse_model(args: &str) -> Result<Self, SettingError> {
        Ok(Self::Model(first_arg(args)?.to_string()))
    }

    /// Parse `/settemperature` arguments: a finite float
    pub fn parse_temperature(args: &str) -> Result<Self, SettingError> {
        let raw = first_arg(args)?;
        match raw.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(Self::Temperature(value)),
            _ => Err(SettingError::Invalid(raw.to_string())),
        }
    }

    /// Parse `/setmaxtokens` arguments: a positive integer
    pub fn parse_max_tokens(args: &str) -> Result<Self, SettingError> {
        let raw = first_arg(args)?;
        match raw.parse::<u32>() {
            Ok(value) if value > 0 => Ok(Self::MaxTokens(value)),
            _ => Err(SettingError::Invalid(raw.to_string())),
        }
    }

    /// Confirmation shown after the update is applied
    #[must_use]
    pub fn confirmation(&self) -> String {
        match self {
            Self::Model(model) => format!("Model changed to {}", model),
            Self::Temperature(t) => format!("Temperature changed to {}", t),
            Self::MaxTokens(n) => format!("Max tokens changed to {}", n),
        }
    }
}
