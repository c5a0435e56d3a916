//! Server-side session storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::{Result, SessionId};

/// Key-value storage scoped to a session.
///
/// Values are stored as serialized JSON text.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session: SessionId, key: &str) -> Result<Option<String>>;

    async fn set(&self, session: SessionId, key: &str, value: String) -> Result<()>;

    async fn remove(&self, session: SessionId, key: &str) -> Result<()>;
}

/// Typed access on top of [`SessionStore`].
#[async_trait]
pub trait SessionStoreExt: SessionStore {
    /// Reads and deserializes a value, returning None if the key is unset.
    async fn get_object<T: DeserializeOwned + Send>(
        &self,
        session: SessionId,
        key: &str,
    ) -> Result<Option<T>> {
        match self.get(session, key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serializes and stores a value.
    async fn set_object<T: Serialize + Sync>(
        &self,
        session: SessionId,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(session, key, raw).await
    }
}

impl<T: SessionStore + ?Sized> SessionStoreExt for T {}

/// Process-local session storage.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, HashMap<String, String>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sessions holding at least one key.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session: SessionId, key: &str) -> Result<Option<String>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&session).and_then(|values| values.get(key)).cloned())
    }

    async fn set(&self, session: SessionId, key: &str, value: String) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, session: SessionId, key: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(values) = sessions.get_mut(&session) {
            values.remove(key);
            if values.is_empty() {
                sessions.remove(&session);
            }
        }
        Ok(())
    }
}
