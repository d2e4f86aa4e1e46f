//! Cached entity services.
//!
//! [`EntityService`] binds a search engine, a [`CacheMethod`] and one entity
//! type into three cached operations: `get_by_id`, `search` and `count`.
//! Entity-specific services add their own cached operations on top.
//!
//! | Service | Entity | Free-text category | Extra operations |
//! |---------|--------|--------------------|------------------|
//! | [`FilmService`] | [`Film`](crate::Film) | `FilmSearch` | `popular` |
//! | [`GenreService`] | [`Genre`](crate::Genre) | `GenreListing` | - |
//! | [`PersonService`] | [`Person`](crate::Person) | `PersonSearch` | `films_by_person` |

mod film;
mod genre;
mod person;

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::CacheMethod;
use crate::query::{QueryBinder, QueryCategory, QueryConstructor, QueryParams, QuerySpec};
use crate::search::{Document, SearchEngine};
use crate::{ConfigError, ServiceError};

pub use film::FilmService;
pub use genre::GenreService;
pub use person::{PersonFilmsEnrichment, PersonService};

/// Entity type served by an [`EntityService`].
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Singular name used in decode errors.
    const NAME: &'static str;
    /// Prefix of cache operation names, e.g. `films` in `films.search`.
    const OPERATIONS: &'static str;
    /// Category used by [`EntityService::search`].
    const SEARCH: QueryCategory;
}

/// Boxed future returned by [`EnrichDocument::enrich`].
pub type EnrichFuture<'a> = Pin<Box<dyn Future<Output = Result<Document, ServiceError>> + Send + 'a>>;

/// Post-fetch hook applied to every document before it is decoded.
pub trait EnrichDocument: Send + Sync {
    fn enrich<'a>(&'a self, document: Document) -> EnrichFuture<'a>;
}

/// Hook that returns documents unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

impl EnrichDocument for NoEnrichment {
    fn enrich<'a>(&'a self, document: Document) -> EnrichFuture<'a> {
        Box::pin(async move { Ok(document) })
    }
}

/// Generic cached lookups for one entity kind.
pub struct EntityService<E> {
    engine: Arc<dyn SearchEngine>,
    cache: CacheMethod,
    collection: String,
    search_query: QueryConstructor,
    enrichment: Arc<dyn EnrichDocument>,
    entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            cache: self.cache.clone(),
            collection: self.collection.clone(),
            search_query: self.search_query,
            enrichment: Arc::clone(&self.enrichment),
            entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityService<E> {
    /// Resolve the free-text binding for `engine` and bind `collection`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Binding`] when the binder has no single builder for
    /// `E::SEARCH` on this engine, [`ServiceError::Config`] for an empty
    /// collection name.
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        cache: CacheMethod,
        collection: impl Into<String>,
        binder: &QueryBinder,
    ) -> Result<Self, ServiceError> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(ConfigError::EmptyCollection { entity: E::NAME }.into());
        }
        let search_query = binder.resolve(engine.kind(), E::SEARCH)?;

        Ok(Self {
            engine,
            cache,
            collection,
            search_query,
            enrichment: Arc::new(NoEnrichment),
            entity: PhantomData,
        })
    }

    pub fn with_enrichment(mut self, enrichment: Arc<dyn EnrichDocument>) -> Self {
        self.enrichment = enrichment;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    pub fn cache(&self) -> &CacheMethod {
        &self.cache
    }

    /// `None` when the collection holds no document with this id.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<E>, ServiceError> {
        let operation = format!("{}.get_by_id", E::OPERATIONS);
        self.cache
            .call(&operation, &(id,), || async {
                match self.engine.get(&self.collection, id).await? {
                    Some(document) => self.materialize(document).await.map(Some),
                    None => {
                        debug!(collection = %self.collection, id, "document not found");
                        Ok(None)
                    }
                }
            })
            .await
    }

    /// Page `page_number` of the entity's free-text query for `text`.
    pub async fn search(
        &self,
        text: &str,
        page_size: u32,
        page_number: u32,
    ) -> Result<Vec<E>, ServiceError> {
        let params = QueryParams::new(Some(text.to_owned()), page_size, page_number)?;
        let operation = format!("{}.search", E::OPERATIONS);
        self.cache
            .call(&operation, &(text, page_size, page_number), || async {
                let query = self.search_query.construct(&params)?;
                self.load(&query).await
            })
            .await
    }

    /// Number of documents in the entity's collection.
    pub async fn count(&self) -> Result<u64, ServiceError> {
        let operation = format!("{}.count", E::OPERATIONS);
        self.cache
            .call(&operation, &(), || async {
                Ok::<_, ServiceError>(self.engine.count(&self.collection).await?)
            })
            .await
    }

    /// Run `query` against this collection, enriching and decoding each hit.
    /// Not cached; callers wrap it in their own cached operation.
    pub(crate) async fn load(&self, query: &QuerySpec) -> Result<Vec<E>, ServiceError> {
        let documents = self.engine.search(&self.collection, query).await?;
        debug!(
            collection = %self.collection,
            category = %query.category(),
            hits = documents.len(),
            "query executed"
        );

        let mut entities = Vec::with_capacity(documents.len());
        for document in documents {
            entities.push(self.materialize(document).await?);
        }
        Ok(entities)
    }

    async fn materialize(&self, document: Document) -> Result<E, ServiceError> {
        let document = self.enrichment.enrich(document).await?;
        serde_json::from_value(document).map_err(|source| ServiceError::Decode {
            collection: self.collection.clone(),
            entity: E::NAME,
            source,
        })
    }
}
