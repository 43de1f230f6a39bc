use super::Session;
use filedeck_core::{RemoteError, RemoteResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Concurrency-safe id → session map. It never touches an adapter; the
/// caller opens adapters before `create` and closes them before `delete`.
/// Clones share the same map.
#[derive(Default, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under `id`. Ids are unique; reusing one is a
    /// `Conflict`.
    pub async fn create(&self, id: &str, session: Arc<Session>) -> RemoteResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(id) {
            return Err(RemoteError::conflict(format!("Session '{}' already exists", id)));
        }
        sessions.insert(id.to_string(), session);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn delete(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(id)
    }

    pub async fn has(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }
}
