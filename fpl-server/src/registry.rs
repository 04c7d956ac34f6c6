//! Named chat sessions hosted by the server.

use fpl_core::{ChatConfig, ChatSession};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub struct SessionRegistry {
    config: ChatConfig,
    sessions: Arc<Mutex<HashMap<String, ChatSession>>>,
}

impl SessionRegistry {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Session for `key`, created on first use.
    pub fn get_or_create(&self, key: &str) -> ChatSession {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                let session = ChatSession::new(self.config.clone());
                tracing::info!(session = key, session_id = %session.id(), "Session created");
                session
            })
            .clone()
    }

    /// Session keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_reuses_session() {
        let registry = SessionRegistry::new(ChatConfig::instant());

        let a = registry.get_or_create("default");
        let b = registry.get_or_create("default");
        let c = registry.get_or_create("league-b");

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(registry.keys(), vec!["default".to_string(), "league-b".to_string()]);
    }
}
