use std::sync::Arc;

use tracing::info;

use crate::cache::{Cache, CacheMethod};
use crate::circuit_breaker::{BreakerRegistry, CircuitState};
use crate::config::{CatalogConfig, ElasticConfig};
use crate::http_client::{HttpAuth, HttpClient, ReqwestHttpClient};
use crate::query::{QueryBinder, QueryCategory};
use crate::search::{ElasticSearchEngine, GuardedSearchEngine, SearchEngine};
use crate::service::{EntityService, FilmService, GenreService, PersonService};
use crate::{ConfigError, ServiceError};

/// Composition root: one engine, one cache and one breaker registry shared
/// by every entity service.
pub struct Catalog {
    films: FilmService,
    genres: GenreService,
    persons: PersonService,
    engine: Arc<dyn SearchEngine>,
    cache: Arc<dyn Cache>,
    breakers: Arc<BreakerRegistry>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn films(&self) -> &FilmService {
        &self.films
    }

    pub fn genres(&self) -> &GenreService {
        &self.genres
    }

    pub fn persons(&self) -> &PersonService {
        &self.persons
    }

    /// Engine as seen by the services (breaker-guarded when enabled).
    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    /// Breaker states by name, for diagnostics.
    pub fn breaker_states(&self) -> Vec<(String, CircuitState)> {
        self.breakers.snapshot()
    }

    /// Release the cache. The catalog is consumed.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        self.cache.release().await?;
        info!("catalog shut down");
        Ok(())
    }
}

/// Builder for [`Catalog`].
///
/// Engine and cache are required; everything else has defaults from
/// [`CatalogConfig::default`].
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use cinedex_core::{Catalog, CatalogConfig, InMemorySearchEngine, MemoryCache};
///
/// let catalog = Catalog::builder()
///     .with_config(CatalogConfig::from_env()?)
///     .with_engine(Arc::new(InMemorySearchEngine::from_fixture_file("fixtures.json")?))
///     .with_cache(Arc::new(MemoryCache::new()))
///     .build()?;
/// let film = catalog.films().get_by_id("6a1e3c1e-9a8b-4c1d-9d3e-2f4a5b6c7d01").await?;
/// ```
pub struct CatalogBuilder {
    config: CatalogConfig,
    engine: Option<Arc<dyn SearchEngine>>,
    cache: Option<Arc<dyn Cache>>,
    binder: QueryBinder,
    breakers: Option<Arc<BreakerRegistry>>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            config: CatalogConfig::default(),
            engine: None,
            cache: None,
            binder: QueryBinder::standard(),
            breakers: None,
        }
    }

    pub fn with_config(mut self, config: CatalogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn SearchEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Elasticsearch engine from the configured URL, API key and timeout.
    pub fn with_elastic(self, http_client: Arc<dyn HttpClient>) -> Self {
        let engine = elastic_engine(&self.config.elastic, http_client);
        self.with_engine(Arc::new(engine))
    }

    /// [`with_elastic`](Self::with_elastic) over a reqwest transport.
    pub fn with_default_elastic(self) -> Self {
        self.with_elastic(Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_binder(mut self, binder: QueryBinder) -> Self {
        self.binder = binder;
        self
    }

    /// Share breaker state with another catalog or an outside observer.
    pub fn with_breakers(mut self, breakers: Arc<BreakerRegistry>) -> Self {
        self.breakers = Some(breakers);
        self
    }

    /// Validate configuration, resolve every query binding and wire services.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Config`] for a missing engine or cache or an invalid
    /// setting, [`ServiceError::Binding`] when any query category does not
    /// resolve to exactly one builder for the engine.
    pub fn build(self) -> Result<Catalog, ServiceError> {
        self.config.validate()?;
        let engine = self.engine.ok_or(ConfigError::MissingEngine)?;
        let cache = self.cache.ok_or(ConfigError::MissingCache)?;
        self.binder.validate(engine.kind(), &QueryCategory::ALL)?;

        let breakers = self
            .breakers
            .unwrap_or_else(|| Arc::new(BreakerRegistry::new(self.config.breaker)));
        let engine: Arc<dyn SearchEngine> = if self.config.breaker_enabled {
            Arc::new(GuardedSearchEngine::new(engine, &breakers))
        } else {
            engine
        };

        let method = CacheMethod::new(Arc::clone(&cache), self.config.cache_ttl)?;
        let collections = &self.config.collections;
        let binder = &self.binder;

        let film_entity = EntityService::new(
            Arc::clone(&engine),
            method.clone(),
            collections.films.clone(),
            binder,
        )?;
        let films = FilmService::new(film_entity.clone(), binder)?;
        let genres = GenreService::new(
            Arc::clone(&engine),
            method.clone(),
            collections.genres.clone(),
            binder,
        )?;
        let person_entity = EntityService::new(
            Arc::clone(&engine),
            method,
            collections.persons.clone(),
            binder,
        )?;
        let persons = PersonService::new(person_entity, film_entity, binder)?;

        info!(
            engine = %engine.kind(),
            breaker_enabled = self.config.breaker_enabled,
            cache_ttl_secs = self.config.cache_ttl.as_secs(),
            "catalog composed"
        );

        Ok(Catalog {
            films,
            genres,
            persons,
            engine,
            cache,
            breakers,
        })
    }
}

fn elastic_engine(config: &ElasticConfig, http_client: Arc<dyn HttpClient>) -> ElasticSearchEngine {
    let auth = match &config.api_key {
        Some(key) => HttpAuth::ApiKey(key.clone()),
        None => HttpAuth::None,
    };
    ElasticSearchEngine::new(config.url.clone(), http_client)
        .with_auth(auth)
        .with_timeout_ms(config.timeout_ms)
}
