use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{Cache, CacheError, CacheFuture};

/// Prefix put in front of every key unless another one is configured.
pub const DEFAULT_KEY_PREFIX: &str = "cinedex:";

/// Keys fetched per `SCAN` round while clearing.
const SCAN_BATCH: usize = 500;

/// Redis-backed cache shared across processes.
///
/// The connection is opened on first use and reused afterwards; a failed
/// connect is retried by the next call. Every key is stored under a prefix
/// so `clear` only touches this cache's entries.
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
    connection: Arc<OnceCell<MultiplexedConnection>>,
    prefix: String,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Parse `url` (`redis://host:port/db`). No connection is made yet.
    pub fn open(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(backend)?;
        Ok(Self {
            client,
            connection: Arc::new(OnceCell::new()),
            prefix: String::from(DEFAULT_KEY_PREFIX),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let connection = self
                    .client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(backend)?;
                info!(prefix = %self.prefix, "redis cache connected");
                Ok::<_, CacheError>(connection)
            })
            .await?;
        Ok(connection.clone())
    }
}

impl Cache for RedisCache {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<Vec<u8>>> {
        Box::pin(async move {
            let mut connection = self.connection().await?;
            let value: Option<Vec<u8>> =
                connection.get(self.namespaced(key)).await.map_err(backend)?;
            Ok(value)
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            if ttl.is_zero() {
                return Ok(());
            }
            // Redis expiry has whole-second resolution.
            let seconds = ttl.as_secs().max(1);
            let mut connection = self.connection().await?;
            let () = connection
                .set_ex(self.namespaced(key), value, seconds)
                .await
                .map_err(backend)?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
        Box::pin(async move {
            let mut connection = self.connection().await?;
            let removed: i64 = connection.del(self.namespaced(key)).await.map_err(backend)?;
            Ok(removed > 0)
        })
    }

    fn clear(&self) -> CacheFuture<'_, ()> {
        Box::pin(async move {
            let mut connection = self.connection().await?;
            let pattern = format!("{}*", self.prefix);
            let mut cursor = 0_u64;
            let mut removed = 0_usize;
            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut connection)
                    .await
                    .map_err(backend)?;
                if !keys.is_empty() {
                    removed += keys.len();
                    let _: i64 = connection.del(&keys).await.map_err(backend)?;
                }
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            debug!(prefix = %self.prefix, removed, "redis cache cleared");
            Ok(())
        })
    }

    /// Entries outlive the process; they expire by TTL.
    fn release(&self) -> CacheFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

fn backend(error: RedisError) -> CacheError {
    CacheError::backend(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_url_is_rejected() {
        let error = RedisCache::open("not a redis url").expect_err("must fail");
        assert!(matches!(error, CacheError::Backend { .. }));
    }

    #[test]
    fn keys_are_namespaced() {
        let cache = RedisCache::open("redis://127.0.0.1:6379/0").expect("url parses");
        assert_eq!(cache.prefix(), DEFAULT_KEY_PREFIX);
        assert_eq!(cache.namespaced("abc"), "cinedex:abc");

        let cache = cache.with_prefix("test:");
        assert_eq!(cache.namespaced("abc"), "test:abc");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_backend_error() {
        let cache = RedisCache::open("redis://127.0.0.1:1/0").expect("url parses");

        let error = cache.get("k").await.expect_err("nothing listens on port 1");
        assert!(matches!(error, CacheError::Backend { .. }));

        // The failed connect is not remembered.
        let error = cache
            .set("k", b"v".to_vec(), Duration::from_secs(5))
            .await
            .expect_err("still unreachable");
        assert!(matches!(error, CacheError::Backend { .. }));
    }

    #[tokio::test]
    async fn zero_ttl_skips_the_round_trip() {
        let cache = RedisCache::open("redis://127.0.0.1:1/0").expect("url parses");
        cache
            .set("k", b"v".to_vec(), Duration::ZERO)
            .await
            .expect("nothing to store");
    }
}
