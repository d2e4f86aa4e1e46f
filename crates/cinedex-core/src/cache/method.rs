use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::{Cache, CacheError, CacheKey};
use crate::ConfigError;

/// Read-through memoization over a [`Cache`].
///
/// On a hit the stored value is decoded and returned without running the
/// computation. On a miss the computation runs exactly once and its result
/// (including `None` and empty lists) is stored before being returned.
///
/// A cache backend that errors is treated as a miss and logged; encoding and
/// decoding failures are returned to the caller.
#[derive(Clone)]
pub struct CacheMethod {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl CacheMethod {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Result<Self, ConfigError> {
        if ttl.is_zero() {
            return Err(ConfigError::ZeroCacheTtl);
        }
        Ok(Self { cache, ttl })
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub async fn call<A, T, E, F, Fut>(&self, operation: &str, args: &A, compute: F) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = CacheKey::derive(operation, args)?;

        match self.cache.get(key.as_str()).await {
            Ok(Some(bytes)) => {
                debug!(operation, key = %key, "cache hit");
                return serde_json::from_slice(&bytes).map_err(|source| {
                    E::from(CacheError::Decode {
                        operation: operation.to_owned(),
                        source,
                    })
                });
            }
            Ok(None) => debug!(operation, key = %key, "cache miss"),
            Err(error) => warn!(operation, %error, "cache read failed, computing without cache"),
        }

        let value = compute().await?;

        let bytes = serde_json::to_vec(&value).map_err(|source| CacheError::Encode {
            operation: operation.to_owned(),
            source,
        })?;
        if let Err(error) = self.cache.set(key.as_str(), bytes, self.ttl).await {
            warn!(operation, %error, "cache write failed");
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::MemoryCache;

    fn method() -> (MemoryCache, CacheMethod) {
        let cache = MemoryCache::new();
        let method =
            CacheMethod::new(Arc::new(cache.clone()), Duration::from_secs(60)).expect("ttl");
        (cache, method)
    }

    #[test]
    fn zero_ttl_is_a_configuration_error() {
        let result = CacheMethod::new(Arc::new(MemoryCache::new()), Duration::ZERO);
        assert!(matches!(result, Err(ConfigError::ZeroCacheTtl)));
    }

    #[tokio::test]
    async fn hit_skips_the_computation() {
        let (_, method) = method();
        let calls = &AtomicUsize::new(0);
        let compute = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CacheError>(vec![1_u32, 2, 3])
        };

        let first = method.call("numbers", &("a",), compute).await.expect("miss");
        let second = method.call("numbers", &("a",), compute).await.expect("hit");

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn absent_results_are_cached() {
        let (cache, method) = method();
        let calls = &AtomicUsize::new(0);
        let compute = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<Option<String>, CacheError>(None)
        };

        assert_eq!(method.call("lookup", &("x",), compute).await.expect("miss"), None);
        assert_eq!(method.call("lookup", &("x",), compute).await.expect("hit"), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn failed_computation_stores_nothing() {
        let (cache, method) = method();

        let result = method
            .call("lookup", &("x",), || async {
                Err::<u64, _>(CacheError::backend("boom"))
            })
            .await;

        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn undecodable_entry_is_reported() {
        let (cache, method) = method();
        let key = CacheKey::derive("lookup", &("x",)).expect("key");
        cache
            .set(key.as_str(), b"not json".to_vec(), Duration::from_secs(60))
            .await
            .expect("set");

        let result = method
            .call("lookup", &("x",), || async { Ok::<u64, CacheError>(1) })
            .await;
        assert!(matches!(result, Err(CacheError::Decode { .. })));
    }
}
