//! Shared fixtures and instrumented collaborators for behaviour tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cinedex_core::cache::CacheFuture;
use cinedex_core::{
    Cache, CacheError, Catalog, CatalogConfig, Document, EngineKind, InMemorySearchEngine,
    MemoryCache, QuerySpec, SearchEngine, SearchError,
};
use serde_json::json;
use tokio::sync::Barrier;

pub const ANN_LEE: &str = "0b7f4b5e-5d0c-4d53-8a35-6f5a1d1f0a01";
pub const BOB_RAY: &str = "0b7f4b5e-5d0c-4d53-8a35-6f5a1d1f0a02";
pub const SCI_FI: &str = "5e0c9a2b-1c2d-4e3f-8a9b-0c1d2e3f4a01";
pub const DRAMA: &str = "5e0c9a2b-1c2d-4e3f-8a9b-0c1d2e3f4a02";

pub fn film_id(n: u32) -> String {
    format!("6a1e3c1e-9a8b-4c1d-9d3e-{n:012}")
}

pub fn film(n: u32, title: &str, rating: f64) -> Document {
    json!({
        "id": film_id(n),
        "title": title,
        "imdb_rating": rating,
        "creation_date": "2020-01-01T00:00:00Z",
        "genres": [{ "id": SCI_FI, "name": "Sci-Fi" }],
        "actors": [],
        "directors": [],
        "writers": []
    })
}

/// Six films matching "star", two with credits for Ann Lee, and one drama.
pub fn seeded_engine() -> InMemorySearchEngine {
    let mut films = (1..=6)
        .map(|n| film(n, &format!("Star Voyage {n}"), 5.0 + f64::from(n)))
        .collect::<Vec<_>>();
    films[0]["actors"] = json!([{ "id": ANN_LEE, "full_name": "Ann Lee" }]);
    films[1]["directors"] = json!([{ "id": ANN_LEE, "full_name": "Ann Lee" }]);
    films[1]["writers"] = json!([{ "id": ANN_LEE, "full_name": "Ann Lee" }]);
    let mut drama = film(7, "Quiet Harbor", 8.1);
    drama["genres"] = json!([{ "id": DRAMA, "name": "Drama" }]);
    films.push(drama);

    InMemorySearchEngine::new()
        .with_collection("film", films)
        .with_collection(
            "genre",
            vec![
                json!({ "id": SCI_FI, "name": "Sci-Fi" }),
                json!({ "id": DRAMA, "name": "Drama", "description": "Serious stories" }),
            ],
        )
        .with_collection(
            "person",
            vec![
                json!({ "id": ANN_LEE, "full_name": "Ann Lee" }),
                json!({ "id": BOB_RAY, "full_name": "Bob Ray" }),
            ],
        )
}

/// Engine wrapper that counts calls and can fail, stall, or rendezvous.
pub struct ScriptedEngine {
    inner: InMemorySearchEngine,
    pub gets: AtomicUsize,
    pub searches: AtomicUsize,
    pub counts: AtomicUsize,
    failing: AtomicBool,
    stalled: AtomicBool,
    barrier: Option<Arc<Barrier>>,
    barrier_uses: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(inner: InMemorySearchEngine) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
            counts: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            barrier: None,
            barrier_uses: AtomicUsize::new(0),
        }
    }

    /// The next `parties` searches wait for each other before proceeding.
    pub fn with_rendezvous(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self.barrier_uses = AtomicUsize::new(parties);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.searches.load(Ordering::SeqCst)
            + self.counts.load(Ordering::SeqCst)
    }

    async fn before_call(&self) -> Result<(), SearchError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchError::transport("scripted outage"));
        }
        Ok(())
    }
}

impl SearchEngine for ScriptedEngine {
    fn kind(&self) -> EngineKind {
        self.inner.kind()
    }

    fn get<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> cinedex_core::search::SearchFuture<'a, Option<Document>> {
        Box::pin(async move {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.before_call().await?;
            self.inner.get(collection, id).await
        })
    }

    fn search<'a>(
        &'a self,
        collection: &'a str,
        query: &'a QuerySpec,
    ) -> cinedex_core::search::SearchFuture<'a, Vec<Document>> {
        Box::pin(async move {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.before_call().await?;
            if let Some(barrier) = &self.barrier {
                let claimed = self
                    .barrier_uses
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                        left.checked_sub(1)
                    })
                    .is_ok();
                if claimed {
                    barrier.wait().await;
                }
            }
            self.inner.search(collection, query).await
        })
    }

    fn count<'a>(&'a self, collection: &'a str) -> cinedex_core::search::SearchFuture<'a, u64> {
        Box::pin(async move {
            self.counts.fetch_add(1, Ordering::SeqCst);
            self.before_call().await?;
            self.inner.count(collection).await
        })
    }
}

/// Cache whose backend can be switched off; reads and writes then fail.
#[derive(Default)]
pub struct FlakyCache {
    inner: MemoryCache,
    down: AtomicBool,
}

impl FlakyCache {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.down.load(Ordering::SeqCst) {
            Err(CacheError::backend("connection refused"))
        } else {
            Ok(())
        }
    }
}

impl Cache for FlakyCache {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<Vec<u8>>> {
        Box::pin(async move {
            self.check()?;
            self.inner.get(key).await
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            self.check()?;
            self.inner.set(key, value, ttl).await
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
        Box::pin(async move {
            self.check()?;
            self.inner.delete(key).await
        })
    }

    fn clear(&self) -> CacheFuture<'_, ()> {
        Box::pin(async move {
            self.check()?;
            self.inner.clear().await
        })
    }
}

pub fn breaker_config(failure_threshold: u32, recovery_secs: u64) -> CatalogConfig {
    let mut config = CatalogConfig::default();
    config.breaker.failure_threshold = failure_threshold;
    config.breaker.recovery_timeout = Duration::from_secs(recovery_secs);
    config
}

pub fn catalog(
    engine: Arc<ScriptedEngine>,
    cache: Arc<dyn Cache>,
    config: CatalogConfig,
) -> Catalog {
    Catalog::builder()
        .with_config(config)
        .with_engine(engine)
        .with_cache(cache)
        .build()
        .expect("catalog builds")
}
