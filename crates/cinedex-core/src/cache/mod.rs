//! Read-through caching for entity lookups.
//!
//! [`Cache`] is the minimal backend capability (opaque bytes with a TTL).
//! [`CacheMethod`] wraps any async read with get-or-compute-and-store
//! semantics, keyed by [`CacheKey`].
//!
//! Concurrent misses on the same key are not coalesced: each caller computes
//! and writes, and the last write wins.

mod memory;
mod method;
mod redis_cache;

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use memory::MemoryCache;
pub use method::CacheMethod;
pub use redis_cache::{RedisCache, DEFAULT_KEY_PREFIX};

/// Default entry lifetime: thirty minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Boxed future returned by [`Cache`] methods.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + Send + 'a>>;

/// Cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {message}")]
    Backend { message: String },

    #[error("failed to encode value for '{operation}': {source}")]
    Encode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cached value for '{operation}' cannot be decoded: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Key/value store with expiry.
pub trait Cache: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous entry.
    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> CacheFuture<'a, ()>;

    /// Remove `key`; returns whether an entry was present.
    fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool>;

    /// Drop every entry.
    fn clear(&self) -> CacheFuture<'_, ()>;

    /// Called once when the owning catalog shuts down. Process-local stores
    /// drop their entries; shared stores keep them.
    fn release(&self) -> CacheFuture<'_, ()> {
        self.clear()
    }
}

/// Deterministic cache key: hex SHA-256 over the JSON encoding of
/// `(operation, args)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive<A>(operation: &str, args: &A) -> Result<Self, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let canonical = serde_json::to_vec(&(operation, args)).map_err(|source| {
            CacheError::Encode {
                operation: operation.to_owned(),
                source,
            }
        })?;
        Ok(Self(hex::encode(Sha256::digest(&canonical))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_produce_equal_keys() {
        let first = CacheKey::derive("films.search", &("star", 5_u32, 2_u32)).expect("key");
        let second = CacheKey::derive("films.search", &("star", 5_u32, 2_u32)).expect("key");

        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
        assert!(first.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn arguments_and_operation_both_distinguish_keys() {
        let base = CacheKey::derive("films.search", &("star", 5_u32, 2_u32)).expect("key");

        let other_page = CacheKey::derive("films.search", &("star", 5_u32, 3_u32)).expect("key");
        let other_operation =
            CacheKey::derive("persons.search", &("star", 5_u32, 2_u32)).expect("key");
        let absent_text = CacheKey::derive("films.search", &(None::<&str>, 5_u32, 2_u32))
            .expect("key");

        assert_ne!(base, other_page);
        assert_ne!(base, other_operation);
        assert_ne!(base, absent_text);
    }

    #[test]
    fn argument_boundaries_are_not_ambiguous() {
        let split_early = CacheKey::derive("op", &("ab", "c")).expect("key");
        let split_late = CacheKey::derive("op", &("a", "bc")).expect("key");
        assert_ne!(split_early, split_late);
    }
}
