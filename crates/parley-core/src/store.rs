//! Session storage
//!
//! [`SessionStore`] is the only owner of [`Session`] values. Storage goes
//! through an injected [`SessionBackend`]; [`MemoryBackend`] keeps everything
//! in process memory and loses it on restart.
//!
//! Each user also gets a lane: an async mutex that callers hold for the whole
//! handling of one message or command, so two requests from the same user
//! never interleave their history updates.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::{Session, UserId};
use crate::settings::{SettingUpdate, UserSettings};
use async_trait::async_trait;
use dashmap::DashMap;
use parley_llm::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

/// Storage backend for sessions
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Get a session by user
    async fn get(&self, user_id: UserId) -> Result<Option<Session>>;

    /// Insert `session` unless one already exists for its user; return the stored one
    async fn get_or_insert(&self, session: Session) -> Result<Session>;

    /// Save a session, replacing any previous value
    async fn save(&self, session: &Session) -> Result<()>;

    /// Delete a session
    async fn delete(&self, user_id: UserId) -> Result<bool>;

    /// All stored sessions
    async fn list(&self) -> Result<Vec<Session>>;
}

/// In-memory session backend
#[derive(Default)]
pub struct MemoryBackend {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl MemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn get(&self, user_id: UserId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&user_id).cloned())
    }

    async fn get_or_insert(&self, session: Session) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .entry(session.user_id)
            .or_insert(session)
            .clone())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.user_id, session.clone());
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(&user_id).is_some())
    }

    async fn list(&self) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut all: Vec<Session> = sessions.values().cloned().collect();
        all.sort_by_key(|s| s.user_id);
        Ok(all)
    }
}

/// Owner of all per-user sessions
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    config: SessionConfig,
    lanes: DashMap<UserId, Arc<Mutex<()>>>,
}

impl SessionStore {
    /// Create a store over the given backend
    #[must_use]
    pub fn new(backend: Arc<dyn SessionBackend>, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            lanes: DashMap::new(),
        }
    }

    /// Create a store backed by process memory
    #[must_use]
    pub fn in_memory(config: SessionConfig) -> Self {
        info!("Initializing in-memory session store");
        Self::new(Arc::new(MemoryBackend::new()), config)
    }

    /// Session defaults in effect
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Acquire the user's lane. Hold the guard while reading and writing
    /// that user's session for one request.
    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lane = self
            .lanes
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lane.lock_owned().await
    }

    /// Return the user's session, creating it with defaults if absent
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Session> {
        if let Some(session) = self.backend.get(user_id).await? {
            return Ok(session);
        }
        debug!(user_id = %user_id, "Creating session with defaults");
        self.backend
            .get_or_insert(Session::new(user_id, self.config.default_settings()))
            .await
    }

    /// Apply `f` to the user's session and store the result
    pub async fn update<F, R>(&self, user_id: UserId, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> R + Send,
        R: Send,
    {
        let mut session = self.get_or_create(user_id).await?;
        let result = f(&mut session);
        self.backend.save(&session).await?;
        Ok(result)
    }

    /// The user's settings, created with defaults if absent
    pub async fn get_or_create_settings(&self, user_id: UserId) -> Result<UserSettings> {
        Ok(self.get_or_create(user_id).await?.settings)
    }

    /// The user's history, created empty if absent
    pub async fn get_or_create_history(&self, user_id: UserId) -> Result<Vec<Message>> {
        Ok(self.get_or_create(user_id).await?.history)
    }

    /// The user's custom context, or the default persona
    pub async fn custom_context(&self, user_id: UserId) -> Result<String> {
        let session = self.backend.get(user_id).await?;
        Ok(session
            .and_then(|s| s.custom_context)
            .unwrap_or_else(|| self.config.default_persona.clone()))
    }

    /// Replace the user's custom context
    pub async fn set_custom_context(&self, user_id: UserId, text: impl Into<String> + Send) -> Result<()> {
        self.update(user_id, |session| session.set_custom_context(text))
            .await
    }

    /// Apply a validated settings update and return the new settings
    pub async fn update_setting(&self, user_id: UserId, update: SettingUpdate) -> Result<UserSettings> {
        self.update(user_id, |session| {
            session.settings.apply(update);
            session.settings.clone()
        })
        .await
    }

    /// Clear the user's history, keeping settings and custom context
    pub async fn clear_history(&self, user_id: UserId) -> Result<()> {
        self.update(user_id, Session::clear_history).await
    }

    /// Discard the user's session; the next access recreates defaults
    pub async fn reset_session(&self, user_id: UserId) -> Result<bool> {
        let removed = self.backend.delete(user_id).await?;
        info!(user_id = %user_id, removed, "Session reset");
        Ok(removed)
    }

    /// Every stored session, ordered by user
    pub async fn snapshot(&self) -> Result<Vec<Session>> {
        self.backend.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PERSONA;
    use std::time::Duration;

    fn store() -> SessionStore {
        SessionStore::in_memory(SessionConfig::default())
    }

    #[tokio::test]
    async fn test_first_access_creates_defaults_once() {
        let store = store();
        let user = UserId(7);

        let first = store.get_or_create_settings(user).await.unwrap();
        assert_eq!(first, UserSettings::default());

        let created_at = store.get_or_create(user).await.unwrap().created_at();
        let again = store.get_or_create(user).await.unwrap();
        assert_eq!(again.settings(), &first);
        assert_eq!(again.created_at(), created_at);
        assert_eq!(store.snapshot().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_settings_keep_last_value() {
        let store = store();
        let user = UserId(1);

        store
            .update_setting(user, SettingUpdate::Temperature(0.3))
            .await
            .unwrap();
        let settings = store
            .update_setting(user, SettingUpdate::Temperature(0.9))
            .await
            .unwrap();

        assert_eq!(settings.temperature, 0.9);
        assert_eq!(store.get_or_create_settings(user).await.unwrap().temperature, 0.9);
        assert_eq!(settings.model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn test_custom_context_default_and_override() {
        let store = store();
        let user = UserId(2);

        assert_eq!(store.custom_context(user).await.unwrap(), DEFAULT_PERSONA);

        store.set_custom_context(user, "You are a math tutor").await.unwrap();
        assert_eq!(
            store.custom_context(user).await.unwrap(),
            "You are a math tutor"
        );
    }

    #[tokio::test]
    async fn test_reset_session_restores_defaults() {
        let store = store();
        let user = UserId(3);

        store.set_custom_context(user, "pirate").await.unwrap();
        store
            .update_setting(user, SettingUpdate::Model("gpt-4".to_string()))
            .await
            .unwrap();
        store
            .update(user, |s| {
                s.push_user("hi");
                s.push_assistant("ahoy");
            })
            .await
            .unwrap();

        assert!(store.reset_session(user).await.unwrap());

        assert!(store.get_or_create_history(user).await.unwrap().is_empty());
        assert_eq!(store.custom_context(user).await.unwrap(), DEFAULT_PERSONA);
        assert_eq!(
            store.get_or_create_settings(user).await.unwrap(),
            UserSettings::default()
        );
    }

    #[tokio::test]
    async fn test_reset_unknown_user() {
        let store = store();
        assert!(!store.reset_session(UserId(99)).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_history_keeps_settings() {
        let store = store();
        let user = UserId(4);

        store
            .update_setting(user, SettingUpdate::MaxTokens(42))
            .await
            .unwrap();
        store.update(user, |s| s.push_user("hello")).await.unwrap();
        store.clear_history(user).await.unwrap();

        assert!(store.get_or_create_history(user).await.unwrap().is_empty());
        assert_eq!(store.get_or_create_settings(user).await.unwrap().max_tokens, 42);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = store();
        store.update(UserId(1), |s| s.push_user("one")).await.unwrap();
        store.update(UserId(2), |s| s.push_user("two")).await.unwrap();

        assert_eq!(
            store.get_or_create_history(UserId(1)).await.unwrap(),
            vec![Message::user("one")]
        );
        assert_eq!(
            store.get_or_create_history(UserId(2)).await.unwrap(),
            vec![Message::user("two")]
        );
    }

    #[tokio::test]
    async fn test_snapshot_sorted_by_user() {
        let store = store();
        store.get_or_create(UserId(5)).await.unwrap();
        store.get_or_create(UserId(1)).await.unwrap();

        let ids: Vec<UserId> = store
            .snapshot()
            .await
            .unwrap()
            .iter()
            .map(Session::user_id)
            .collect();
        assert_eq!(ids, vec![UserId(1), UserId(5)]);
    }

    #[tokio::test]
    async fn test_lane_serializes_same_user() {
        let store = Arc::new(store());
        let user = UserId(10);

        let guard = store.lock(user).await;

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.lock(user).await;
                store.update(user, |s| s.push_user("second")).await.unwrap();
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.update(user, |s| s.push_user("first")).await.unwrap();
        drop(guard);
        contender.await.unwrap();

        assert_eq!(
            store.get_or_create_history(user).await.unwrap(),
            vec![Message::user("first"), Message::user("second")]
        );
    }

    #[tokio::test]
    async fn test_lanes_are_per_user() {
        let store = store();
        let _a = store.lock(UserId(1)).await;
        // A different user's lane is free while user 1 holds theirs
        let b = tokio::time::timeout(Duration::from_millis(100), store.lock(UserId(2))).await;
        assert!(b.is_ok());
    }
}
