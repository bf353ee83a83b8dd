//! Parley Core - Conversation Session Manager
//!
//! This crate holds the platform-independent half of the relay:
//! - Access: allow-list gate for one-to-one chats
//! - Sessions: per-user settings, history and custom context
//! - Truncation: word-count history budget
//! - Prompting: completion request assembly
//! - Formatting: MarkdownV2 escaping and reply shaping
//! - Relay: command execution and the message-handling boundary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod prompt;
pub mod relay;
pub mod session;
pub mod settings;
pub mod store;
pub mod truncate;

pub use access::{denial_message, is_authorized, AccessGate, AllowList, ChatScope};
pub use commands::{Command, CommandKind, MenuAction, HELP_TEXT};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use format::{
    escape_reserved_chars, format_reply, mention_markdown_v2, FormattedReply, MessageButton,
    OutboundMessage, RenderMode,
};
pub use prompt::PromptAssembler;
pub use relay::{is_addressed_to, InboundMessage, Relay, RelayError, APOLOGY};
pub use session::{Session, UserId};
pub use settings::{SettingError, SettingUpdate, UserSettings};
pub use store::{MemoryBackend, SessionBackend, SessionStore};
pub use truncate::{count_tokens, truncate_history};
