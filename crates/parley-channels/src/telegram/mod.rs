//! Telegram - teloxide adapter
//!
//! Normalizes Telegram updates into relay events and delivers the replies.

mod adapter;
mod config;
mod handler;


pub use adapter::TelegramAdapter;
pub use config::{TelegramConfig, DEFAULT_ALLOWED_USERS_FILE};
