use std::sync::Arc;

use super::{Document, EngineKind, SearchEngine, SearchError, SearchFuture};
use crate::circuit_breaker::{BreakerRegistry, CircuitBreaker, CircuitOpen};
use crate::query::QuerySpec;

impl From<CircuitOpen> for SearchError {
    fn from(error: CircuitOpen) -> Self {
        Self::unavailable(format!(
            "search backend temporarily unavailable: {error}"
        ))
    }
}

/// Wraps an engine with one circuit breaker per engine operation.
///
/// Breakers are named `<engine>.<operation>` (for example `elastic.search`)
/// and come from a shared [`BreakerRegistry`], so their state outlives any
/// single guarded instance.
pub struct GuardedSearchEngine {
    inner: Arc<dyn SearchEngine>,
    get: Arc<CircuitBreaker>,
    search: Arc<CircuitBreaker>,
    count: Arc<CircuitBreaker>,
}

impl GuardedSearchEngine {
    pub fn new(inner: Arc<dyn SearchEngine>, registry: &BreakerRegistry) -> Self {
        let kind = inner.kind();
        Self {
            get: registry.breaker(&format!("{kind}.get")),
            search: registry.breaker(&format!("{kind}.search")),
            count: registry.breaker(&format!("{kind}.count")),
            inner,
        }
    }

    pub fn inner(&self) -> &Arc<dyn SearchEngine> {
        &self.inner
    }
}

impl SearchEngine for GuardedSearchEngine {
    fn kind(&self) -> EngineKind {
        self.inner.kind()
    }

    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> SearchFuture<'a, Option<Document>> {
        Box::pin(self.get.call(self.inner.get(collection, id)))
    }

    fn search<'a>(
        &'a self,
        collection: &'a str,
        query: &'a QuerySpec,
    ) -> SearchFuture<'a, Vec<Document>> {
        Box::pin(self.search.call(self.inner.search(collection, query)))
    }

    fn count<'a>(&'a self, collection: &'a str) -> SearchFuture<'a, u64> {
        Box::pin(self.count.call(self.inner.count(collection)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    use crate::search::SearchErrorKind;

    #[derive(Default)]
    struct FailingCounts {
        calls: AtomicUsize,
    }

    impl SearchEngine for FailingCounts {
        fn kind(&self) -> EngineKind {
            EngineKind::Memory
        }

        fn get<'a>(&'a self, _: &'a str, _: &'a str) -> SearchFuture<'a, Option<Document>> {
            Box::pin(async { Ok(None) })
        }

        fn search<'a>(&'a self, _: &'a str, _: &'a QuerySpec) -> SearchFuture<'a, Vec<Document>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn count<'a>(&'a self, _: &'a str) -> SearchFuture<'a, u64> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(SearchError::transport("connection refused"))
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn open_breaker_reports_unavailable_per_operation() {
        let inner = Arc::new(FailingCounts::default());
        let registry = BreakerRegistry::new(CircuitBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(10),
        });
        let guarded = GuardedSearchEngine::new(inner.clone(), &registry);

        for _ in 0..2 {
            let error = guarded.count("film").await.expect_err("backend fails");
            assert_eq!(error.kind(), SearchErrorKind::Transport);
        }

        let error = guarded.count("film").await.expect_err("breaker open");
        assert_eq!(error.kind(), SearchErrorKind::Unavailable);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        // Other operations keep their own breakers.
        assert!(guarded.get("film", "f1").await.expect("get passes").is_none());
        assert_eq!(
            registry.breaker("memory.count").state(),
            CircuitState::Open
        );
        assert_eq!(registry.breaker("memory.get").state(), CircuitState::Closed);
    }
}
