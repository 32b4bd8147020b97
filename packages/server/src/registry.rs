//! Concurrent registry of live sessions.
//!
//! The lock only guards the map itself. It is never held across network I/O:
//! broadcasting works on a snapshot, so a slow peer cannot block
//! register/remove from other sessions.

use std::{collections::BTreeMap, sync::Arc};

use relaychat_shared::{Session, SessionKey};
use tokio::sync::RwLock;

/// Shared handle to the set of connected sessions.
///
/// Cloning is cheap and every clone sees the same registry. Each relay owns
/// its own registry, so several relays in one process never interfere.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    sessions: Arc<RwLock<BTreeMap<SessionKey, Arc<Session>>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session under `key`.
    ///
    /// Returns `false` without touching the existing entry when the key is
    /// already taken.
    pub async fn register(&self, key: SessionKey, session: Arc<Session>) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return false;
        }
        sessions.insert(key, session);
        true
    }

    /// Remove the session under `key`. Removing an absent key is a no-op.
    pub async fn remove(&self, key: &SessionKey) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(key)
    }

    /// Remove `key` only while it still maps to `session`.
    ///
    /// Keeps a failure path from evicting a newer session that reused the key.
    pub async fn remove_entry(&self, key: &SessionKey, session: &Arc<Session>) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(key) {
            Some(current) if Arc::ptr_eq(current, session) => {
                sessions.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Point-in-time view of the membership, ordered by key.
    ///
    /// Sessions registered afterwards are not included; sessions removed
    /// afterwards may still appear.
    pub async fn broadcast_snapshot(&self) -> Vec<(SessionKey, Arc<Session>)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(key, session)| (key.clone(), session.clone()))
            .collect()
    }

    /// Remove and return every session
    pub async fn drain(&self) -> Vec<(SessionKey, Arc<Session>)> {
        std::mem::take(&mut *self.sessions.write().await)
            .into_iter()
            .collect()
    }

    pub async fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
