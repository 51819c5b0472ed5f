//! In-memory session storage.

use std::sync::Arc;

use dashmap::DashMap;

use crate::session::SessionStore;

/// One client session's key-value state, backed by a `DashMap`.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: DashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values.remove(key);
    }

    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Maps session ids to their stores, for hosts without their own session
/// layer (e.g. the bundled middleware).
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<MemorySessionStore>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the store for a session id, creating it on first use.
    pub fn session(&self, id: &str) -> Arc<MemorySessionStore> {
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(MemorySessionStore::new()))
            .clone()
    }

    /// Drop a session's state entirely.
    pub fn evict(&self, id: &str) {
        self.sessions.remove(id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
