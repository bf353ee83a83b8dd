//! Response formatting
//!
//! Group replies are rendered with Telegram MarkdownV2, so every reserved
//! character is backslash-escaped and the sender's mention is prefixed.
//! Private replies are sent as plain text.
//!
//! The body stored in history is exactly the body that was displayed: escaped
//! in groups, raw in private chats. The mention prefix is not stored.

use crate::access::ChatScope;
use serde::{Deserialize, Serialize};

/// Characters MarkdownV2 treats as markup
pub const RESERVED_CHARS: &[char] = &[
    '.', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '!',
    '\\',
];

/// Telegram's per-message text limit, in characters
pub const MESSAGE_CHAR_LIMIT: usize = 4096;

/// Backslash-escape every reserved character
#[must_use]
pub fn escape_reserved_chars(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        if RESERVED_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// MarkdownV2 inline mention of a user
#[must_use]
pub fn mention_markdown_v2(user_id: i64, name: &str) -> String {
    format!("[{}](tg://user?id={})", escape_reserved_chars(name), user_id)
}

/// Rendering mode for outbound text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    /// No markup parsing
    #[default]
    Plain,
    /// Strict MarkdownV2 parsing
    MarkdownV2,
}

/// Inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageButton {
    /// Button label
    pub text: String,
    /// Callback data sent back when pressed
    pub callback_data: String,
}

impl MessageButton {
    /// Create a callback button
    #[must_use]
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: data.into(),
        }
    }
}

/// Message to deliver back to the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Text content
    pub text: String,
    /// How the platform should render `text`
    pub render_mode: RenderMode,
    /// Quote the triggering message
    pub quote_trigger: bool,
    /// Inline keyboard, one button per row
    pub buttons: Vec<MessageButton>,
}

impl OutboundMessage {
    /// Plain-text message
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            ..Default::default()
        }
    }

    /// Plain-text message quoting the trigger when sent to a group
    #[must_use]
    pub fn for_scope(content: impl Into<String>, scope: ChatScope) -> Self {
        Self {
            text: content.into(),
            quote_trigger: scope.is_multi_party(),
            ..Default::default()
        }
    }

    /// Add a button
    #[must_use]
    pub fn with_button(mut self, button: MessageButton) -> Self {
        self.buttons.push(button);
        self
    }

    /// Split the text into chunks within [`MESSAGE_CHAR_LIMIT`].
    ///
    /// In MarkdownV2 mode a chunk never ends between a backslash and the
    /// character it escapes.
    #[must_use]
    pub fn chunks(&self) -> Vec<String> {
        split_text(&self.text, MESSAGE_CHAR_LIMIT, self.render_mode == RenderMode::MarkdownV2)
    }
}

fn split_text(text: &str, limit: usize, keep_escapes: bool) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + limit).min(chars.len());
        if keep_escapes && end < chars.len() {
            // count the run of backslashes before the cut; odd means one is dangling
            let run = chars[start..end]
                .iter()
                .rev()
                .take_while(|&&c| c == '\\')
                .count();
            if run % 2 == 1 && end - start > 1 {
                end -= 1;
            }
        }
        chunks.push(chars[start..end].iter().collect());
        start = end;
    }
    chunks
}

/// A reply ready for delivery plus the body to record in history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedReply {
    /// What to send
    pub message: OutboundMessage,
    /// What to append to history as the assistant turn
    pub history_text: String,
}

/// Format a model reply for `scope`
#[must_use]
pub fn format_reply(raw_text: &str, scope: ChatScope, mention: &str) -> FormattedReply {
    match scope {
        ChatScope::MultiParty => {
            let escaped = escape_reserved_chars(raw_text);
            FormattedReply {
                message: OutboundMessage {
                    text: format!("{}, {}", mention, escaped),
                    render_mode: RenderMode::MarkdownV2,
                    quote_trigger: true,
                    buttons: Vec::new(),
                },
                history_text: escaped,
            }
        }
        ChatScope::SingleParty => FormattedReply {
            message: OutboundMessage::text(raw_text),
            history_text: raw_text.to_string(),
        },
    }
}
