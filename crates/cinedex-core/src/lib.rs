//! # Cinedex Core
//!
//! Cached, resilient lookups of films, genres and people over a full-text
//! search index.
//!
//! ## Overview
//!
//! - **Query specs** describe *what* to look up, independent of the engine
//! - **Query binder** links each query category to one builder per engine
//! - **Search engines** execute specs: Elasticsearch or in-memory
//! - **Read-through cache** memoizes every service operation
//! - **Circuit breakers** shed load while the search backend is failing
//! - **Entity services** compose all of the above per entity kind
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Cache capability, key derivation, read-through wrapper |
//! | [`catalog`] | Composition root and builder |
//! | [`circuit_breaker`] | Breaker state machine and registry |
//! | [`config`] | Settings and environment loading |
//! | [`domain`] | Film, Genre, Person models |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`query`] | Query params, specs and the binder |
//! | [`search`] | Search engine contract and implementations |
//! | [`service`] | Cached entity services |
//! | [`telemetry`] | Tracing subscriber setup |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / caller   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Entity Service  │────▶│  Cache Method    │
//! └────────┬────────┘     └──────────────────┘
//!          │ miss
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Query Binder    │────▶│ Query Spec       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Guarded Engine  │────▶│ Circuit Breaker  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Elastic / Memory│
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use cinedex_core::ServiceError;
//!
//! fn describe(error: &ServiceError) -> &'static str {
//!     match error {
//!         error if error.is_unavailable() => "temporarily unavailable, retry later",
//!         ServiceError::Validation(_) => "invalid request",
//!         ServiceError::Config(_) | ServiceError::Binding(_) => "misconfigured",
//!         _ => "internal error",
//!     }
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod query;
pub mod search;
pub mod service;
pub mod telemetry;

pub use cache::{
    Cache, CacheError, CacheKey, CacheMethod, MemoryCache, RedisCache, DEFAULT_CACHE_TTL,
};
pub use catalog::{Catalog, CatalogBuilder};
pub use circuit_breaker::{
    BreakerRegistry, CircuitBreaker, CircuitBreakerConfig, CircuitOpen, CircuitState,
};
pub use config::{CatalogConfig, Collections, ElasticConfig};
pub use domain::{Film, FilmShort, Genre, GenreRef, Person, PersonFilm, PersonRef, PersonRole};
pub use error::{ConfigError, ServiceError, ValidationError};
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use query::{
    page_offset, BindingError, QueryBinder, QueryBuilder, QueryCategory, QueryParams, QuerySpec,
    SortKey, SortOrder,
};
pub use search::memory::FixtureError;
pub use search::{
    Document, ElasticSearchEngine, EngineKind, GuardedSearchEngine, InMemorySearchEngine,
    SearchEngine, SearchError, SearchErrorKind,
};
pub use service::{
    EnrichDocument, Entity, EntityService, FilmService, GenreService, NoEnrichment,
    PersonService,
};
