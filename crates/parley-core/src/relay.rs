//! Message-handling boundary
//!
//! [`Relay`] ties the access gate, session store, prompt assembler, completion
//! provider and formatter together. Every entry point checks the gate first,
//! then holds the user's lane until the reply is ready. Failures past the gate
//! are logged and answered with a generic apology.

use crate::access::{denial_message, AccessGate, ChatScope};
use crate::commands::{main_menu, Command, CommandKind, MenuAction, HELP_TEXT};
use crate::error::Error;
use crate::format::{format_reply, FormattedReply, OutboundMessage};
use crate::prompt::PromptAssembler;
use crate::session::UserId;
use crate::settings::SettingUpdate;
use crate::store::SessionStore;
use parley_llm::LlmProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Reply sent when handling fails after the access check
pub const APOLOGY: &str = "Sorry, an error occurred while processing your message.";

/// Default wait for a completion
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// Failure inside message or command handling
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Session store failure
    #[error("session store error: {0}")]
    Store(#[from] Error),

    /// Completion provider failure
    #[error("completion error: {0}")]
    Completion(#[from] parley_llm::Error),

    /// Completion did not return in time
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// Session dump could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Inbound text event, already normalized by the channel adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender
    pub user_id: UserId,
    /// Chat classification
    pub scope: ChatScope,
    /// Message text
    pub text: String,
    /// Pre-rendered MarkdownV2 mention of the sender
    pub mention: String,
    /// Sender's display name
    pub sender_name: String,
}

impl InboundMessage {
    /// Message from a one-to-one chat
    #[must_use]
    pub fn private(user_id: impl Into<UserId>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            scope: ChatScope::SingleParty,
            text: text.into(),
            mention: String::new(),
            sender_name: String::new(),
        }
    }

    /// Message from a group chat
    #[must_use]
    pub fn group(
        user_id: impl Into<UserId>,
        text: impl Into<String>,
        mention: impl Into<String>,
    ) -> Self {
        Self {
            scope: ChatScope::MultiParty,
            mention: mention.into(),
            ..Self::private(user_id, text)
        }
    }

    /// Set the sender's display name
    #[must_use]
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self
    }
}

/// Whether `text` mentions `@bot_username`, ignoring case
#[must_use]
pub fn is_addressed_to(text: &str, bot_username: &str) -> bool {
    let needle = format!("@{}", bot_username.trim_start_matches('@')).to_lowercase();
    text.to_lowercase().contains(&needle)
}

/// Conversation relay
pub struct Relay {
    store: Arc<SessionStore>,
    gate: Arc<AccessGate>,
    provider: Arc<dyn LlmProvider>,
    assembler: PromptAssembler,
    bot_username: Option<String>,
    completion_timeout: Duration,
}

impl Relay {
    /// Create a relay
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        gate: Arc<AccessGate>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        let assembler = PromptAssembler::new(store.config());
        Self {
            store,
            gate,
            provider,
            assembler,
            bot_username: None,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
        }
    }

    /// Username that group messages must mention
    #[must_use]
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Completion timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Session store
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Access gate
    #[must_use]
    pub fn gate(&self) -> &Arc<AccessGate> {
        &self.gate
    }

    /// Route an inbound text event.
    ///
    /// Returns `None` for events that get no reply: unknown commands, commands
    /// addressed to another bot and group messages that do not mention the bot.
    pub async fn handle(&self, inbound: &InboundMessage) -> Option<OutboundMessage> {
        if let Some(command) = Command::parse(&inbound.text) {
            if !command.is_for(self.bot_username.as_deref()) {
                debug!(user_id = %inbound.user_id, command = command.kind.name(), "Ignoring command for another bot");
                return None;
            }
            return Some(self.handle_command(inbound, &command).await);
        }
        if crate::commands::is_command(&inbound.text) {
            debug!(user_id = %inbound.user_id, "Ignoring unknown command");
            return None;
        }
        if !self.is_conversational(inbound) {
            return None;
        }
        Some(self.handle_message(inbound).await)
    }

    /// Whether `inbound` is plain text the relay answers with a completion
    #[must_use]
    pub fn is_conversational(&self, inbound: &InboundMessage) -> bool {
        !crate::commands::is_command(&inbound.text)
            && (!inbound.scope.is_multi_party() || self.is_addressed(&inbound.text))
    }

    fn is_addressed(&self, text: &str) -> bool {
        match &self.bot_username {
            Some(username) => is_addressed_to(text, username),
            None => false,
        }
    }

    /// Relay a conversational message to the model and format the answer
    #[instrument(skip(self, inbound), fields(user = %inbound.user_id, scope = ?inbound.scope))]
    pub async fn handle_message(&self, inbound: &InboundMessage) -> OutboundMessage {
        if !self.gate.is_authorized(inbound.user_id, inbound.scope).await {
            return OutboundMessage::for_scope(denial_message(inbound.user_id), inbound.scope);
        }

        let _lane = self.store.lock(inbound.user_id).await;

        match self.converse(inbound).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(user_id = %inbound.user_id, error = %e, "Failed to process message");
                OutboundMessage::for_scope(APOLOGY, inbound.scope)
            }
        }
    }

    async fn converse(&self, inbound: &InboundMessage) -> Result<OutboundMessage, RelayError> {
        let user_id = inbound.user_id;
        let assembler = &self.assembler;
        let text = inbound.text.as_str();

        let request = self
            .store
            .update(user_id, |session| assembler.build_request(session, text))
            .await?;

        let response = tokio::time::timeout(self.completion_timeout, self.provider.complete(request))
            .await
            .map_err(|_| RelayError::Timeout(self.completion_timeout))??;

        if response.content.is_empty() {
            return Err(parley_llm::Error::InvalidResponse("empty completion".to_string()).into());
        }

        let FormattedReply {
            message,
            history_text,
        } = format_reply(&response.content, inbound.scope, &inbound.mention);

        self.store
            .update(user_id, move |session| session.push_assistant(history_text))
            .await?;

        info!(
            user_id = %user_id,
            model = %response.model,
            finish_reason = ?response.finish_reason,
            total_tokens = ?response.usage.as_ref().map(|u| u.total_tokens),
            "Reply ready"
        );
        Ok(message)
    }

    /// Execute a parsed command
    #[instrument(skip(self, inbound), fields(user = %inbound.user_id, command = command.kind.name()))]
    pub async fn handle_command(&self, inbound: &InboundMessage, command: &Command) -> OutboundMessage {
        if command.kind == CommandKind::Start {
            // a failed reload is logged by the gate and the previous list stays
            let _ = self.gate.refresh().await;
        }

        if !self.gate.is_authorized(inbound.user_id, inbound.scope).await {
            return OutboundMessage::for_scope(denial_message(inbound.user_id), inbound.scope);
        }

        let _lane = self.store.lock(inbound.user_id).await;

        match self.run_command(inbound, command).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(user_id = %inbound.user_id, error = %e, "Failed to execute command");
                OutboundMessage::for_scope(APOLOGY, inbound.scope)
            }
        }
    }

    async fn run_command(
        &self,
        inbound: &InboundMessage,
        command: &Command,
    ) -> Result<OutboundMessage, RelayError> {
        let user_id = inbound.user_id;
        let scope = inbound.scope;

        let text = match command.kind {
            CommandKind::Start => {
                self.store.get_or_create_settings(user_id).await?;
                let mut menu = main_menu(&inbound.sender_name);
                menu.quote_trigger = scope.is_multi_party();
                return Ok(menu);
            }
            CommandKind::Help => HELP_TEXT.to_string(),
            CommandKind::Settings => self.store.get_or_create_settings(user_id).await?.to_string(),
            CommandKind::SetContext => {
                if command.args.is_empty() {
                    return Ok(self.usage(command.kind, scope));
                }
                self.store
                    .set_custom_context(user_id, command.args.clone())
                    .await?;
                "Context updated.".to_string()
            }
            CommandKind::SetModel | CommandKind::SetTemperature | CommandKind::SetMaxTokens => {
                let parsed = match command.kind {
                    CommandKind::SetModel => SettingUpdate::parse_model(&command.args),
                    CommandKind::SetTemperature => SettingUpdate::parse_temperature(&command.args),
                    _ => SettingUpdate::parse_max_tokens(&command.args),
                };
                match parsed {
                    Ok(update) => {
                        if let SettingUpdate::Model(model) = &update {
                            if !self.provider.supports_model(model) {
                                warn!(user_id = %user_id, model = %model, "Model is not known to the provider");
                            }
                        }
                        let confirmation = update.confirmation();
                        self.store.update_setting(user_id, update).await?;
                        confirmation
                    }
                    Err(e) => {
                        warn!(user_id = %user_id, command = command.kind.name(), error = %e, "Rejected setting");
                        return Ok(self.usage(command.kind, scope));
                    }
                }
            }
            CommandKind::ResetChat => {
                self.store.reset_session(user_id).await?;
                "Context, settings and history have been reset.".to_string()
            }
            CommandKind::ClearHistory => {
                self.store.clear_history(user_id).await?;
                "Conversation history cleared.".to_string()
            }
            CommandKind::ShowContext => {
                // only the caller's own session; groups pass the gate for anyone
                let session = self.store.get_or_create(user_id).await?;
                serde_json::to_string_pretty(&session)?
            }
        };

        Ok(OutboundMessage::for_scope(text, scope))
    }

    fn usage(&self, kind: CommandKind, scope: ChatScope) -> OutboundMessage {
        OutboundMessage::for_scope(kind.usage().unwrap_or(HELP_TEXT), scope)
    }

    /// Execute an inline menu action
    #[instrument(skip(self))]
    pub async fn handle_menu_action(
        &self,
        user_id: UserId,
        scope: ChatScope,
        action: MenuAction,
    ) -> OutboundMessage {
        if !self.gate.is_authorized(user_id, scope).await {
            return OutboundMessage::text(denial_message(user_id));
        }

        let _lane = self.store.lock(user_id).await;

        let result: Result<String, RelayError> = match action {
            MenuAction::Settings => self
                .store
                .get_or_create_settings(user_id)
                .await
                .map(|s| s.to_string())
                .map_err(Into::into),
            MenuAction::Help => Ok(HELP_TEXT.to_string()),
            MenuAction::ResetContext => self
                .store
                .reset_session(user_id)
                .await
                .map(|_| "Context, settings and history have been reset.".to_string())
                .map_err(Into::into),
        };

        match result {
            Ok(text) => OutboundMessage::text(text),
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to execute menu action");
                OutboundMessage::text(APOLOGY)
            }
        }
    }
}
