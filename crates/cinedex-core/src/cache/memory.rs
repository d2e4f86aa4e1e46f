use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::{Cache, CacheFuture};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe in-process cache backend.
///
/// Clones share the same entries. Expired entries are dropped on every `set`.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<tokio::sync::RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired entries.
    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.entries.write().await.retain(|_, entry| entry.is_live(now));
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Cache for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<Vec<u8>>> {
        Box::pin(async move {
            let now = Instant::now();
            let entries = self.entries.read().await;
            Ok(entries
                .get(key)
                .filter(|entry| entry.is_live(now))
                .map(|entry| entry.value.clone()))
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            // A zero TTL would be expired on arrival.
            if ttl.is_zero() {
                return Ok(());
            }
            let now = Instant::now();
            let mut entries = self.entries.write().await;
            entries.retain(|_, entry| entry.is_live(now));
            entries.insert(
                key.to_owned(),
                CacheEntry {
                    value,
                    expires_at: now + ttl,
                },
            );
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
        Box::pin(async move { Ok(self.entries.write().await.remove(key).is_some()) })
    }

    fn clear(&self) -> CacheFuture<'_, ()> {
        Box::pin(async move {
            self.entries.write().await.clear();
            Ok(())
        })
    }
}
