//! Telegram message handler and bot runner

use super::adapter::TelegramAdapter;
use crate::error::Result;
use crate::util::mask_for_logging;
use parley_core::{ChatScope, MenuAction, OutboundMessage, Relay, RenderMode};
use std::sync::Arc;
use teloxide::{
    payloads::SendMessageSetters,
    prelude::*,
    types::{CallbackQuery, ChatAction, ChatId, Message, MessageId, ParseMode, ReplyParameters},
};
use tracing::{debug, error, info, instrument, warn};

impl TelegramAdapter {
    /// Start polling and dispatch updates to the relay until Ctrl-C
    #[instrument(skip(self, relay))]
    pub async fn run(self: Arc<Self>, relay: Arc<Relay>) -> Result<()> {
        info!("Starting Telegram bot");

        let bot = self.bot.clone();
        let message_relay = relay.clone();

        let handler = dptree::entry()
            .branch(
                Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                    let relay = message_relay.clone();
                    async move { Self::handle_message(relay, bot, msg).await }
                }),
            )
            .branch(
                Update::filter_callback_query().endpoint(move |bot: Bot, query: CallbackQuery| {
                    let relay = relay.clone();
                    async move { Self::handle_callback(relay, bot, query).await }
                }),
            );

        // No per-chat ordering here; the relay serializes each user on its own lane
        Dispatcher::builder(bot, handler)
            .distribution_function(|_| None::<std::convert::Infallible>)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram bot stopped");
        Ok(())
    }

    /// Handle an incoming message
    pub(crate) async fn handle_message(
        relay: Arc<Relay>,
        bot: Bot,
        msg: Message,
    ) -> ResponseResult<()> {
        let Some(inbound) = Self::normalize_message(&msg) else {
            return Ok(());
        };

        debug!(
            chat_id = %msg.chat.id,
            user_id = %inbound.user_id,
            text = %mask_for_logging(&inbound.text),
            "Received message"
        );

        if relay.is_conversational(&inbound) {
            let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
        }

        if let Some(outbound) = relay.handle(&inbound).await {
            Self::send_outbound(&bot, msg.chat.id, Some(msg.id), &outbound).await;
        }

        Ok(())
    }

    /// Handle an inline keyboard press
    pub(crate) async fn handle_callback(
        relay: Arc<Relay>,
        bot: Bot,
        query: CallbackQuery,
    ) -> ResponseResult<()> {
        let _ = bot.answer_callback_query(query.id.clone()).await;

        let Some(action) = query.data.as_deref().and_then(MenuAction::from_callback) else {
            debug!(data = ?query.data, "Ignoring unknown callback");
            return Ok(());
        };

        let scope = query
            .message
            .as_ref()
            .and_then(|m| Self::chat_scope(m.chat()))
            .unwrap_or(ChatScope::SingleParty);
        let user_id = Self::user_id(&query.from);

        let outbound = relay.handle_menu_action(user_id, scope, action).await;

        let Some(message) = query.message.as_ref() else {
            return Ok(());
        };
        let chat_id = message.chat().id;

        if let Err(e) = bot
            .edit_message_text(chat_id, message.id(), &outbound.text)
            .await
        {
            warn!(chat_id = %chat_id, error = %e, "Failed to edit menu message, sending new one");
            Self::send_outbound(&bot, chat_id, None, &outbound).await;
        }

        Ok(())
    }

    /// Deliver an outbound message, split into Telegram-sized chunks.
    ///
    /// Only the first chunk quotes the trigger and only the last carries the
    /// keyboard. A MarkdownV2 chunk that Telegram rejects is resent as plain
    /// text.
    pub(crate) async fn send_outbound(
        bot: &Bot,
        chat_id: ChatId,
        trigger: Option<MessageId>,
        outbound: &OutboundMessage,
    ) {
        let chunks = outbound.chunks();
        let last = chunks.len().saturating_sub(1);

        for (index, chunk) in chunks.iter().enumerate() {
            let mut request = bot.send_message(chat_id, chunk);
            if outbound.render_mode == RenderMode::MarkdownV2 {
                request = request.parse_mode(ParseMode::MarkdownV2);
            }
            if index == 0 && outbound.quote_trigger {
                if let Some(trigger) = trigger {
                    request = request.reply_parameters(ReplyParameters::new(trigger));
                }
            }
            if index == last {
                if let Some(keyboard) = Self::build_keyboard(&outbound.buttons) {
                    request = request.reply_markup(keyboard);
                }
            }

            match request.await {
                Ok(sent) => {
                    debug!(chat_id = %chat_id, message_id = %sent.id, len = chunk.len(), "Sent message");
                }
                Err(e) if outbound.render_mode == RenderMode::MarkdownV2 => {
                    warn!(chat_id = %chat_id, error = %e, "MarkdownV2 send failed, falling back to plain text");
                    if let Err(e2) = bot.send_message(chat_id, chunk).await {
                        error!(chat_id = %chat_id, error = %e2, "Failed to send message");
                    }
                }
                Err(e) => {
                    error!(chat_id = %chat_id, error = %e, "Failed to send message");
                }
            }
        }
    }
}
