//! Telegram adapter core

use super::config::TelegramConfig;
use crate::error::{Error, Result};
use parley_core::{mention_markdown_v2, ChatScope, InboundMessage, MessageButton, UserId};
use teloxide::{
    prelude::*,
    types::{Chat, InlineKeyboardButton, InlineKeyboardMarkup, Message as TelegramMessage, User},
};

/// Telegram bot adapter
pub struct TelegramAdapter {
    pub(crate) bot: Bot,
    pub(crate) config: TelegramConfig,
}

impl TelegramAdapter {
    /// Create a new Telegram adapter
    #[must_use]
    pub fn new(config: TelegramConfig) -> Self {
        let bot = Bot::new(&config.bot_token);
        Self { bot, config }
    }

    /// Get the underlying bot
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Adapter configuration
    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    /// Ask Telegram for the bot's username
    pub async fn bot_username(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| Error::Telegram(e.to_string()))?;
        Ok(me.username.clone().unwrap_or_default())
    }

    /// Classify a chat. Channels are not conversations and yield `None`.
    #[must_use]
    pub fn chat_scope(chat: &Chat) -> Option<ChatScope> {
        if chat.is_private() {
            Some(ChatScope::SingleParty)
        } else if chat.is_group() || chat.is_supergroup() {
            Some(ChatScope::MultiParty)
        } else {
            None
        }
    }

    /// Convert a user into the core identity
    #[must_use]
    pub fn user_id(user: &User) -> UserId {
        UserId(user.id.0 as i64)
    }

    /// Convert a Telegram text message into an inbound event.
    ///
    /// Messages without text, without a sender or from a channel are skipped.
    #[must_use]
    pub fn normalize_message(msg: &TelegramMessage) -> Option<InboundMessage> {
        let text = msg.text()?;
        if text.trim().is_empty() {
            return None;
        }
        let scope = Self::chat_scope(&msg.chat)?;
        let user = msg.from.as_ref()?;
        let user_id = Self::user_id(user);

        Some(InboundMessage {
            user_id,
            scope,
            text: text.to_string(),
            mention: mention_markdown_v2(user_id.0, &user.full_name()),
            sender_name: user.first_name.clone(),
        })
    }

    /// Build an inline keyboard with one button per row
    #[must_use]
    pub fn build_keyboard(buttons: &[MessageButton]) -> Option<InlineKeyboardMarkup> {
        if buttons.is_empty() {
            return None;
        }

        let rows: Vec<Vec<InlineKeyboardButton>> = buttons
            .iter()
            .map(|b| vec![InlineKeyboardButton::callback(&b.text, &b.callback_data)])
            .collect();

        Some(InlineKeyboardMarkup::new(rows))
    }
}
