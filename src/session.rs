//!
//! src/session.rs
//!
//! In-memory credential store for destination-service tokens.
//! Map-level lock is held only for lookup/insert/sweep; token
//! replacement on refresh happens under a per-entry mutex so
//! unrelated sessions never contend.
//!

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>
}

impl Session {
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token,
            refresh_token,
            expires_at: now + chrono::Duration::seconds(expires_in),
            created_at: now
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

pub struct SessionStore {
    ttl: chrono::Duration,
    inner: RwLock<HashMap<String, Arc<Mutex<Session>>>>
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::hours(6)),
            inner: RwLock::new(HashMap::new())
        }
    }

    /// Stores a session under a fresh opaque id and returns the id.
    pub async fn insert(&self, session: Session) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut map = self.inner.write().await;
        map.insert(session_id.clone(), Arc::new(Mutex::new(session)));
        session_id
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<Session>>> {
        let map = self.inner.read().await;
        map.get(session_id).cloned()
    }

    pub async fn remove(&self, session_id: &str) {
        let mut map = self.inner.write().await;
        map.remove(session_id);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Drops every session older than the configured ttl and returns
    /// how many were evicted.
    pub async fn evict_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let mut map = self.inner.write().await;
        let before = map.len();

        let stale: Vec<String> = {
            let mut ids = Vec::new();
            for (id, entry) in map.iter() {
                let created_at = match entry.try_lock() {
                    Ok(session) => session.created_at,
                    // refresh in flight, skip until next sweep
                    Err(_) => continue
                };
                if created_at < cutoff {
                    ids.push(id.clone());
                }
            }
            ids
        };

        for id in &stale {
            map.remove(id);
        }

        let evicted = before - map.len();
        if evicted > 0 {
            info!(evicted, remaining = map.len(), "session.sweep");
        }
        evicted
    }

    /// Periodic sweep loop; spawned once at startup.
    pub async fn run_sweeper(self: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            self.evict_expired().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let id = store.insert(
            Session::new("access".to_string(), Some("refresh".to_string()), 3600)
        ).await;

        let entry = store.get(&id).await.expect("session should exist");
        let session = entry.lock().await;
        assert_eq!(session.access_token, "access");
        assert_eq!(session.refresh_token.as_deref(), Some("refresh"));
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn unknown_id_yields_none() {
        let store = SessionStore::new(Duration::from_secs(3600));
        assert!(store.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn negative_expiry_marks_session_expired() {
        let session = Session::new("access".to_string(), None, -10);
        assert!(session.is_expired());
    }

    #[tokio::test]
    async fn sweep_evicts_only_entries_past_ttl() {
        let store = SessionStore::new(Duration::from_secs(3600));

        let stale_id = store.insert(
            Session::new("old".to_string(), None, 3600)
        ).await;
        // age the entry past the ttl by hand
        {
            let entry = store.get(&stale_id).await.unwrap();
            let mut session = entry.lock().await;
            session.created_at = Utc::now() - chrono::Duration::hours(7);
        }
        let fresh_id = store.insert(
            Session::new("new".to_string(), None, 3600)
        ).await;

        let evicted = store.evict_expired().await;
        assert_eq!(evicted, 1);
        assert!(store.get(&stale_id).await.is_none());
        assert!(store.get(&fresh_id).await.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let id = store.insert(Session::new("a".to_string(), None, 3600)).await;
        store.remove(&id).await;
        store.remove(&id).await;
        assert!(store.get(&id).await.is_none());
    }
}
