//! Access gate
//!
//! Multi-party chats are trusted implicitly. In single-party chats the actor
//! must be on the allow-list, which is a newline-delimited file of integer
//! user ids. The list is read at startup and again on `/start` once the file
//! has changed.

use crate::error::{Error, Result};
use crate::session::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Chat scope classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatScope {
    /// One-to-one chat
    SingleParty,
    /// Group-like chat with several participants
    MultiParty,
}

impl ChatScope {
    /// Whether this is a group-like scope
    #[must_use]
    pub fn is_multi_party(self) -> bool {
        matches!(self, Self::MultiParty)
    }
}

/// Set of authorized user ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    users: HashSet<UserId>,
}

impl AllowList {
    /// Parse newline-delimited ids. Blank lines are ignored.
    ///
    /// # Errors
    /// Returns [`Error::AllowListParse`] naming the first malformed line
    pub fn parse(content: &str) -> Result<Self> {
        let mut users = HashSet::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let id: i64 = line.parse().map_err(|_| Error::AllowListParse {
                line: index + 1,
                content: line.to_string(),
            })?;
            users.insert(UserId(id));
        }
        Ok(Self { users })
    }

    /// Read and parse an allow-list file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Whether `user_id` is listed
    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.users.contains(&user_id)
    }

    /// Number of listed users
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl FromIterator<i64> for AllowList {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            users: iter.into_iter().map(UserId).collect(),
        }
    }
}

/// Pure authorization rule
#[must_use]
pub fn is_authorized(actor: UserId, scope: ChatScope, allow_list: &AllowList) -> bool {
    scope.is_multi_party() || allow_list.contains(actor)
}

/// Reply for a denied actor. Shows their own id so they can ask to be listed.
#[must_use]
pub fn denial_message(actor: UserId) -> String {
    format!(
        "Sorry, you do not have access to this bot.\n\
         Your Telegram ID: {}\n\
         If you want access, send this ID to the bot owner.",
        actor
    )
}

/// Access gate holding the current allow-list and where it came from
pub struct AccessGate {
    source: Option<PathBuf>,
    allow_list: RwLock<AllowList>,
    loaded_stamp: Mutex<Option<FileStamp>>,
}

/// Modification time and length of the allow-list file at its last load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    async fn read(path: &Path) -> Option<Self> {
        let meta = tokio::fs::metadata(path).await.ok()?;
        Some(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

impl AccessGate {
    /// Gate over a fixed list with no reload source
    #[must_use]
    pub fn with_list(allow_list: AllowList) -> Self {
        Self {
            source: None,
            allow_list: RwLock::new(allow_list),
            loaded_stamp: Mutex::new(None),
        }
    }

    /// Gate loaded from a file, reloadable with [`AccessGate::reload`]
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stamp = FileStamp::read(&path).await;
        let allow_list = AllowList::load(&path).await?;
        info!(path = %path.display(), users = allow_list.len(), "Loaded allow-list");
        Ok(Self {
            source: Some(path),
            allow_list: RwLock::new(allow_list),
            loaded_stamp: Mutex::new(stamp),
        })
    }

    /// Check whether `actor` may use the bot in `scope`
    pub async fn is_authorized(&self, actor: UserId, scope: ChatScope) -> bool {
        let allowed = is_authorized(actor, scope, &*self.allow_list.read().await);
        if !allowed {
            debug!(user_id = %actor, "User not in allow-list");
        }
        allowed
    }

    /// Re-read the allow-list from its source.
    ///
    /// On failure the previous list stays in effect. Returns the number of
    /// listed users.
    pub async fn reload(&self) -> Result<usize> {
        let Some(path) = &self.source else {
            return Ok(self.allow_list.read().await.len());
        };

        let stamp = FileStamp::read(path).await;
        match AllowList::load(path).await {
            Ok(fresh) => {
                let count = fresh.len();
                *self.allow_list.write().await = fresh;
                *self.loaded_stamp.lock().await = stamp;
                info!(path = %path.display(), users = count, "Reloaded allow-list");
                Ok(count)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Allow-list reload failed, keeping previous list");
                Err(e)
            }
        }
    }

    /// Reload only when the file's modification time or length changed since
    /// the last successful load.
    ///
    /// Returns `None` when the file is unchanged and was not read.
    pub async fn refresh(&self) -> Result<Option<usize>> {
        let Some(path) = &self.source else {
            return Ok(None);
        };

        let current = FileStamp::read(path).await;
        if current.is_some() && current == *self.loaded_stamp.lock().await {
            debug!(path = %path.display(), "Allow-list unchanged, skipping reload");
            return Ok(None);
        }
        self.reload().await.map(Some)
    }
}
