//! Error types for parley-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Allow-list source could not be read
    #[error("allow-list read failed: {0}")]
    AllowListIo(#[from] std::io::Error),

    /// Allow-list source contains a line that is not an integer identity
    #[error("allow-list line {line} is not a valid user id: {content:?}")]
    AllowListParse {
        /// 1-based line number
        line: usize,
        /// Offending line, trimmed
        content: String,
    },

    /// Session backend failure
    #[error("session storage error: {0}")]
    Storage(String),

    /// Session could not be serialized for display
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
