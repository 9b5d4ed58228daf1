//! Session store: one serialized employee snapshot per client
//!
//! A store never fails towards its caller. Unreachable storage, missing keys
//! and unparsable content all read as "no session".

use async_trait::async_trait;
use common::{cache::RedisPool, models::Employee};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing::{debug, error, warn};

/// Key under which a client's snapshot is stored
pub const SESSION_KEY: &str = "employee_session";

/// Durable storage for the authenticated employee's snapshot
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Overwrite any stored snapshot
    async fn save(&self, snapshot: &Employee);

    /// The stored snapshot, or `None` if absent, unreadable or unparsable
    async fn load(&self) -> Option<Employee>;

    /// Remove the stored snapshot. Idempotent.
    async fn clear(&self);
}

/// Hands out the session store belonging to one client
pub trait SessionStoreProvider: Send + Sync {
    fn for_client(&self, client_token: &str) -> Arc<dyn SessionStore>;
}

fn encode(snapshot: &Employee) -> Option<String> {
    match serde_json::to_string(snapshot) {
        Ok(raw) => Some(raw),
        Err(e) => {
            error!("Failed to serialize session snapshot for {}: {}", snapshot.id, e);
            None
        }
    }
}

fn decode(raw: &str) -> Option<Employee> {
    match serde_json::from_str(raw) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("Discarding unparsable session snapshot: {}", e);
            None
        }
    }
}

/// Session store for one client, kept in Redis
#[derive(Clone)]
pub struct RedisSessionStore {
    redis_pool: RedisPool,
    key: String,
    ttl_seconds: Option<u64>,
}

impl RedisSessionStore {
    pub fn new(redis_pool: RedisPool, client_token: &str, ttl_seconds: Option<u64>) -> Self {
        Self {
            redis_pool,
            key: format!("{}:{}", SESSION_KEY, client_token),
            ttl_seconds,
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, snapshot: &Employee) {
        let Some(raw) = encode(snapshot) else {
            return;
        };
        debug!("Saving session snapshot for employee {}", snapshot.id);
        if let Err(e) = self.redis_pool.set(&self.key, &raw, self.ttl_seconds).await {
            error!("Failed to save session snapshot: {}", e);
        }
    }

    async fn load(&self) -> Option<Employee> {
        match self.redis_pool.get(&self.key).await {
            Ok(raw) => raw.as_deref().and_then(decode),
            Err(e) => {
                error!("Failed to read session snapshot: {}", e);
                None
            }
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.redis_pool.delete(&self.key).await {
            error!("Failed to clear session snapshot: {}", e);
        }
    }
}

/// Provider of Redis-backed session stores, one key per client token
#[derive(Clone)]
pub struct RedisSessionStores {
    redis_pool: RedisPool,
    ttl_seconds: Option<u64>,
}

impl RedisSessionStores {
    pub fn new(redis_pool: RedisPool, ttl_seconds: Option<u64>) -> Self {
        Self {
            redis_pool,
            ttl_seconds,
        }
    }
}

impl SessionStoreProvider for RedisSessionStores {
    fn for_client(&self, client_token: &str) -> Arc<dyn SessionStore> {
        Arc::new(RedisSessionStore::new(
            self.redis_pool.clone(),
            client_token,
            self.ttl_seconds,
        ))
    }
}

/// Session store held in process memory. Stores the serialized form so that
/// parse failures behave exactly like the Redis store.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored content with arbitrary text
    pub fn put_raw(&self, raw: impl Into<String>) {
        *self.lock() = Some(raw.into());
    }

    pub fn raw(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, snapshot: &Employee) {
        if let Some(raw) = encode(snapshot) {
            *self.lock() = Some(raw);
        }
    }

    async fn load(&self) -> Option<Employee> {
        let raw = self.lock().clone();
        raw.as_deref().and_then(decode)
    }

    async fn clear(&self) {
        *self.lock() = None;
    }
}

/// Provider of in-memory session stores
#[derive(Clone, Default)]
pub struct MemorySessionStores {
    stores: Arc<Mutex<HashMap<String, MemorySessionStore>>>,
}

impl MemorySessionStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// The concrete store for a client, for inspection in tests
    pub fn store(&self, client_token: &str) -> MemorySessionStore {
        self.stores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(client_token.to_string())
            .or_default()
            .clone()
    }
}

impl SessionStoreProvider for MemorySessionStores {
    fn for_client(&self, client_token: &str) -> Arc<dyn SessionStore> {
        Arc::new(self.store(client_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::employee;

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let store = MemorySessionStore::new();
        let snapshot = employee("alice", "admin");

        store.save(&snapshot).await;
        assert_eq!(store.load().await, Some(snapshot));
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let store = MemorySessionStore::new();
        store.save(&employee("alice", "admin")).await;
        let bob = employee("bob", "employee");
        store.save(&bob).await;

        assert_eq!(store.load().await, Some(bob));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = MemorySessionStore::new();
        store.save(&employee("alice", "admin")).await;

        store.clear().await;
        assert_eq!(store.load().await, None);
        store.clear().await;
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_unparsable_content_reads_as_absent() {
        let store = MemorySessionStore::new();

        store.put_raw("{not json");
        assert_eq!(store.load().await, None);

        store.put_raw(r#"{"id": "not-a-uuid", "name": "alice"}"#);
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_snapshot_carries_company_name_and_no_credential() {
        let store = MemorySessionStore::new();
        store.save(&employee("alice", "manager")).await;

        let raw: serde_json::Value = serde_json::from_str(&store.raw().unwrap()).unwrap();
        for field in ["id", "name", "email", "role", "is_active", "company_id"] {
            assert!(raw.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(raw["companies"]["name"], "Hive Co");
        assert!(raw.get("password").is_none());
    }

    #[tokio::test]
    async fn test_provider_isolates_clients() {
        let stores = MemorySessionStores::new();
        stores.for_client("a").save(&employee("alice", "admin")).await;

        assert!(stores.for_client("a").load().await.is_some());
        assert!(stores.for_client("b").load().await.is_none());
    }
}
