use std::fmt::{Debug, Formatter};

use thiserror::Error;

use super::{QueryCategory, QueryParams, QueryPayload, QuerySpec};
use crate::search::{elastic, memory, EngineKind};
use crate::ValidationError;

/// Engine-specific builder for one query category.
///
/// The engine link is an associated constant, so the binder can match
/// builders to engines without instantiating either.
pub trait QueryBuilder: 'static {
    const ENGINE: EngineKind;
    const CATEGORY: QueryCategory;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError>;
}

type BuildFn = fn(&QueryParams) -> Result<QueryPayload, ValidationError>;

/// Registry entry linking `(engine, category)` to a builder.
#[derive(Clone, Copy)]
pub struct QueryBinding {
    engine: EngineKind,
    category: QueryCategory,
    name: &'static str,
    build: BuildFn,
}

impl QueryBinding {
    pub fn of<Q: QueryBuilder>() -> Self {
        Self {
            engine: Q::ENGINE,
            category: Q::CATEGORY,
            name: std::any::type_name::<Q>(),
            build: Q::build,
        }
    }

    pub const fn engine(&self) -> EngineKind {
        self.engine
    }

    pub const fn category(&self) -> QueryCategory {
        self.category
    }

    /// Builder type name, used in diagnostics.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl Debug for QueryBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBinding")
            .field("engine", &self.engine)
            .field("category", &self.category)
            .field("name", &self.name)
            .finish()
    }
}

/// A resolved binding, ready to build specs for one engine.
#[derive(Debug, Clone, Copy)]
pub struct QueryConstructor {
    binding: QueryBinding,
}

impl QueryConstructor {
    pub fn construct(&self, params: &QueryParams) -> Result<QuerySpec, ValidationError> {
        let payload = (self.binding.build)(params)?;
        Ok(QuerySpec::new(
            self.binding.category,
            self.binding.engine,
            payload,
        ))
    }

    pub const fn engine(&self) -> EngineKind {
        self.binding.engine
    }

    pub const fn category(&self) -> QueryCategory {
        self.binding.category
    }
}

/// Wiring defect between query builders and engines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("no '{category}' query builder is registered for engine '{engine}'")]
    NotFound {
        category: QueryCategory,
        engine: EngineKind,
    },
    #[error("{} '{category}' query builders are registered for engine '{engine}': {}", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        category: QueryCategory,
        engine: EngineKind,
        candidates: Vec<&'static str>,
    },
}

/// Static table of query builders, resolved per engine at composition time.
#[derive(Debug, Clone, Default)]
pub struct QueryBinder {
    bindings: Vec<QueryBinding>,
}

impl QueryBinder {
    pub fn new(bindings: Vec<QueryBinding>) -> Self {
        Self { bindings }
    }

    /// Every builder shipped with this crate.
    pub fn standard() -> Self {
        Self::new(vec![
            QueryBinding::of::<elastic::ElasticFilmSearch>(),
            QueryBinding::of::<elastic::ElasticPopularFilms>(),
            QueryBinding::of::<elastic::ElasticGenreListing>(),
            QueryBinding::of::<elastic::ElasticPersonSearch>(),
            QueryBinding::of::<elastic::ElasticFilmsByPerson>(),
            QueryBinding::of::<memory::MemoryFilmSearch>(),
            QueryBinding::of::<memory::MemoryPopularFilms>(),
            QueryBinding::of::<memory::MemoryGenreListing>(),
            QueryBinding::of::<memory::MemoryPersonSearch>(),
            QueryBinding::of::<memory::MemoryFilmsByPerson>(),
        ])
    }

    pub fn with<Q: QueryBuilder>(mut self) -> Self {
        self.bindings.push(QueryBinding::of::<Q>());
        self
    }

    pub fn bindings(&self) -> &[QueryBinding] {
        &self.bindings
    }

    /// Find the single builder registered for `engine` and `category`.
    pub fn resolve(
        &self,
        engine: EngineKind,
        category: QueryCategory,
    ) -> Result<QueryConstructor, BindingError> {
        let mut matches = self
            .bindings
            .iter()
            .filter(|binding| binding.engine == engine && binding.category == category);

        let Some(first) = matches.next() else {
            return Err(BindingError::NotFound { category, engine });
        };

        let rest = matches.collect::<Vec<_>>();
        if !rest.is_empty() {
            let mut candidates = Vec::with_capacity(rest.len() + 1);
            candidates.push(first.name);
            candidates.extend(rest.iter().map(|binding| binding.name));
            return Err(BindingError::Ambiguous {
                category,
                engine,
                candidates,
            });
        }

        Ok(QueryConstructor { binding: *first })
    }

    /// Check that every category resolves for `engine`.
    pub fn validate(
        &self,
        engine: EngineKind,
        categories: &[QueryCategory],
    ) -> Result<(), BindingError> {
        for category in categories {
            self.resolve(engine, *category)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShadowGenreListing;

    impl QueryBuilder for ShadowGenreListing {
        const ENGINE: EngineKind = EngineKind::Memory;
        const CATEGORY: QueryCategory = QueryCategory::GenreListing;

        fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
            memory::MemoryGenreListing::build(params)
        }
    }

    #[test]
    fn standard_binder_covers_every_category_for_both_engines() {
        let binder = QueryBinder::standard();
        for engine in EngineKind::ALL {
            binder
                .validate(engine, &QueryCategory::ALL)
                .expect("standard bindings are complete");
        }
    }

    #[test]
    fn resolved_constructor_builds_for_its_engine() {
        let binder = QueryBinder::standard();
        let constructor = binder
            .resolve(EngineKind::Elastic, QueryCategory::GenreListing)
            .expect("binding exists");
        let params = QueryParams::new(None, 10, 2).expect("valid params");

        let spec = constructor.construct(&params).expect("spec builds");
        assert_eq!(spec.engine(), EngineKind::Elastic);
        assert_eq!(spec.category(), QueryCategory::GenreListing);
        assert!(matches!(spec.payload(), QueryPayload::Elastic(_)));
    }

    #[test]
    fn missing_binding_is_reported() {
        let binder = QueryBinder::new(vec![QueryBinding::of::<elastic::ElasticFilmSearch>()]);

        let error = binder
            .resolve(EngineKind::Memory, QueryCategory::FilmSearch)
            .expect_err("memory has no builder here");
        assert_eq!(
            error,
            BindingError::NotFound {
                category: QueryCategory::FilmSearch,
                engine: EngineKind::Memory,
            }
        );
    }

    #[test]
    fn duplicate_binding_is_ambiguous() {
        let binder = QueryBinder::standard().with::<ShadowGenreListing>();

        let error = binder
            .resolve(EngineKind::Memory, QueryCategory::GenreListing)
            .expect_err("two builders claim the same slot");
        match error {
            BindingError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }

        // The other engine is unaffected.
        assert!(binder
            .resolve(EngineKind::Elastic, QueryCategory::GenreListing)
            .is_ok());
    }
}
