//! Behaviour tests for the read-through cache.
//!
//! These tests verify what callers observe through `CacheMethod`: hits skip
//! the computation, misses run it once, values round-trip exactly, and a
//! failing cache backend never changes the answer.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cinedex_core::{
    Cache, CacheError, CacheKey, CacheMethod, Film, FilmShort, Genre, MemoryCache, Person,
    RedisCache, ServiceError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use support::{seeded_engine, FlakyCache, ScriptedEngine};

fn method(cache: &MemoryCache) -> CacheMethod {
    CacheMethod::new(Arc::new(cache.clone()), Duration::from_secs(1800)).expect("ttl")
}

async fn assert_round_trip<T>(method: &CacheMethod, operation: &str, value: T)
where
    T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug + Clone,
{
    let stored = method
        .call(operation, &("round-trip",), || async {
            Ok::<_, CacheError>(value.clone())
        })
        .await
        .expect("miss computes");
    let cached = method
        .call(operation, &("round-trip",), || async {
            Err::<T, _>(CacheError::backend("must not be called on a hit"))
        })
        .await
        .expect("hit decodes");

    assert_eq!(stored, value);
    assert_eq!(cached, value);
}

fn sample_film() -> Film {
    serde_json::from_value(support::film(1, "Star Voyage 1", 7.25)).expect("film")
}

// =============================================================================
// Cache: hit and miss
// =============================================================================

#[tokio::test]
async fn when_value_is_cached_the_computation_is_not_invoked() {
    // Given: A cache method and an instrumented computation
    let cache = MemoryCache::new();
    let method = method(&cache);
    let calls = &AtomicUsize::new(0);
    let compute = move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, CacheError>(42_u64)
    };

    // When: The same operation runs twice with equal arguments
    let first = method.call("films.count", &(), compute).await.expect("miss");
    let second = method.call("films.count", &(), compute).await.expect("hit");

    // Then: The computation ran once and both calls agree
    assert_eq!((first, second), (42, 42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn when_value_is_missing_it_is_computed_once_and_stored_under_its_key() {
    // Given: An empty cache
    let cache = MemoryCache::new();
    let method = method(&cache);

    // When: A lookup misses
    let value = method
        .call("films.search", &("star", 5_u32, 2_u32), || async {
            Ok::<_, CacheError>(vec![String::from("Star Voyage 6")])
        })
        .await
        .expect("miss computes");

    // Then: The stored entry sits under the derived key and decodes to the result
    let key = CacheKey::derive("films.search", &("star", 5_u32, 2_u32)).expect("key");
    let bytes = cache.get(key.as_str()).await.expect("get").expect("entry stored");
    let stored: Vec<String> = serde_json::from_slice(&bytes).expect("decodes");
    assert_eq!(stored, value);
}

#[tokio::test]
async fn when_arguments_differ_results_are_cached_separately() {
    // Given: A cache method
    let cache = MemoryCache::new();
    let method = method(&cache);

    // When: Two pages of the same search are requested
    for page in [1_u32, 2] {
        method
            .call("films.search", &("star", 5_u32, page), || async move {
                Ok::<_, CacheError>(page)
            })
            .await
            .expect("computes");
    }

    // Then: Each page has its own entry
    assert_eq!(cache.len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn when_ttl_elapses_the_value_is_recomputed() {
    // Given: A value cached with a one minute TTL
    let cache = MemoryCache::new();
    let method = CacheMethod::new(Arc::new(cache.clone()), Duration::from_secs(60)).expect("ttl");
    let calls = &AtomicUsize::new(0);
    let compute = move || async move {
        Ok::<_, CacheError>(calls.fetch_add(1, Ordering::SeqCst))
    };
    method.call("op", &(), compute).await.expect("miss");

    // When: The TTL passes
    tokio::time::advance(Duration::from_secs(61)).await;
    let value = method.call("op", &(), compute).await.expect("miss again");

    // Then: The computation ran again
    assert_eq!(value, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Cache: exact round trips for every service return type
// =============================================================================

#[tokio::test]
async fn when_service_results_are_cached_they_round_trip_exactly() {
    let cache = MemoryCache::new();
    let method = method(&cache);
    let film = sample_film();

    assert_round_trip(&method, "films.get_by_id", Some(film.clone())).await;
    assert_round_trip::<Option<Film>>(&method, "films.get_by_id.absent", None).await;
    assert_round_trip(&method, "films.search", vec![film.clone()]).await;
    assert_round_trip::<Vec<Film>>(&method, "films.search.empty", Vec::new()).await;
    assert_round_trip(&method, "films.count", 6_u64).await;
    assert_round_trip(&method, "persons.films_by_person", vec![film.short()]).await;
    assert_round_trip::<Vec<FilmShort>>(&method, "persons.films_by_person.empty", Vec::new())
        .await;
    assert_round_trip(
        &method,
        "genres.get_by_id",
        Some(Genre {
            id: film.genres[0].id,
            name: String::from("Sci-Fi"),
            description: None,
        }),
    )
    .await;
    assert_round_trip(
        &method,
        "persons.get_by_id",
        Some(Person {
            id: film.id,
            full_name: String::from("Ann Lee"),
            films: Vec::new(),
        }),
    )
    .await;
}

// =============================================================================
// Cache: backend failures
// =============================================================================

#[tokio::test]
async fn when_cache_backend_is_down_services_still_answer_from_the_engine() {
    // Given: A catalog whose cache backend is down
    let engine = Arc::new(ScriptedEngine::new(seeded_engine()));
    let cache = Arc::new(FlakyCache::default());
    cache.set_down(true);
    let catalog = support::catalog(engine.clone(), cache.clone(), Default::default());

    // When: The same search runs twice
    let first = catalog.films().search("star", 5, 1).await.expect("search");
    let second = catalog.films().search("star", 5, 1).await.expect("search");

    // Then: Both calls return the correct page and both reached the engine
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
    assert_eq!(engine.searches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn when_cache_backend_recovers_caching_resumes() {
    // Given: A cache that was down for the first call
    let engine = Arc::new(ScriptedEngine::new(seeded_engine()));
    let cache = Arc::new(FlakyCache::default());
    let catalog = support::catalog(engine.clone(), cache.clone(), Default::default());
    cache.set_down(true);
    catalog.films().count().await.expect("count");

    // When: The backend comes back
    cache.set_down(false);
    catalog.films().count().await.expect("count");
    catalog.films().count().await.expect("count");

    // Then: Only the first call after recovery reached the engine again
    assert_eq!(engine.counts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn when_cached_bytes_are_corrupt_the_error_is_surfaced() {
    // Given: A corrupt entry under the films.count key
    let cache = MemoryCache::new();
    let key = CacheKey::derive("films.count", &()).expect("key");
    cache
        .set(key.as_str(), b"{".to_vec(), Duration::from_secs(60))
        .await
        .expect("set");
    let engine = Arc::new(ScriptedEngine::new(seeded_engine()));
    let catalog = support::catalog(engine.clone(), Arc::new(cache), Default::default());

    // When: The count is requested
    let error = catalog.films().count().await.expect_err("decode fails");

    // Then: The failure is reported, not coerced into a fresh value
    assert!(matches!(error, ServiceError::Cache(CacheError::Decode { .. })));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn when_redis_is_unreachable_services_answer_and_shut_down_cleanly() {
    // Given: A catalog cached in a Redis server nobody is listening for
    let engine = Arc::new(ScriptedEngine::new(seeded_engine()));
    let cache = RedisCache::open("redis://127.0.0.1:1/0").expect("url parses");
    let catalog = support::catalog(engine.clone(), Arc::new(cache), Default::default());

    // When: The same count runs twice
    let first = catalog.films().count().await.expect("count");
    let second = catalog.films().count().await.expect("count");

    // Then: Both answers come from the engine
    assert_eq!(first, 7);
    assert_eq!(second, 7);
    assert_eq!(engine.counts.load(Ordering::SeqCst), 2);

    // And: Shutdown leaves shared entries alone, so it never touches the server
    catalog.shutdown().await.expect("shutdown");
}
