//! Per-user session state
//!
//! A [`Session`] aggregates a user's settings, conversation history and
//! optional custom context. Sessions are created and destroyed only by the
//! [`SessionStore`](crate::store::SessionStore); other components receive a
//! `&mut Session` inside [`SessionStore::update`](crate::store::SessionStore::update).

use crate::settings::UserSettings;
use chrono::{DateTime, Utc};
use parley_llm::{Message, MessageRole};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform user identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Conversation state for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub(crate) user_id: UserId,
    pub(crate) settings: UserSettings,
    pub(crate) history: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) custom_context: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_activity: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(user_id: UserId, settings: UserSettings) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            settings,
            history: Vec::new(),
            custom_context: None,
            created_at: now,
            last_activity: now,
        }
    }

    /// Owner of this session
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Current settings
    #[must_use]
    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    /// Mutable settings
    pub fn settings_mut(&mut self) -> &mut UserSettings {
        &mut self.settings
    }

    /// Conversation history, oldest first
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Custom context override, if set
    #[must_use]
    pub fn custom_context(&self) -> Option<&str> {
        self.custom_context.as_deref()
    }

    /// Custom context, or `default` when none is set
    #[must_use]
    pub fn context_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.custom_context.as_deref().unwrap_or(default)
    }

    /// Replace the custom context
    pub fn set_custom_context(&mut self, text: impl Into<String>) {
        self.custom_context = Some(text.into());
    }

    /// When the session was created
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last time a turn was appended
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Append an assistant turn
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    fn push(&mut self, message: Message) {
        debug_assert_ne!(message.role, MessageRole::System);
        self.history.push(message);
        self.last_activity = Utc::now();
    }

    /// Clear history, keeping settings and custom context
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.last_activity = Utc::now();
    }

    pub(crate) fn history_mut(&mut self) -> &mut Vec<Message> {
        &mut self.history
    }
}
