//! Parley Channels - Channel Adapters
//!
//! Connects the relay to Telegram via teloxide.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod telegram;
pub mod util;

pub use error::{Error, Result};
pub use telegram::{TelegramAdapter, TelegramConfig};
