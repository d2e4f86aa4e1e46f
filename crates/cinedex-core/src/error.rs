use thiserror::Error;

use crate::cache::CacheError;
use crate::query::BindingError;
use crate::search::SearchError;

/// Validation errors for caller-supplied query input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("page_size must be greater than zero")]
    ZeroPageSize,
    #[error("page_number must be greater than zero")]
    ZeroPageNumber,
    #[error("sort key cannot be empty")]
    EmptySortKey,
    #[error("sort key '{value}' names no field")]
    SortKeyWithoutField { value: String },
    #[error("query category '{category}' requires a sort key")]
    MissingSortKey { category: &'static str },
    #[error("query category '{category}' requires query text")]
    MissingQueryText { category: &'static str },
}

/// Composition-time configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("catalog requires a search engine")]
    MissingEngine,
    #[error("catalog requires a cache")]
    MissingCache,
    #[error("cache ttl must be greater than zero")]
    ZeroCacheTtl,
    #[error("circuit breaker failure_threshold must be greater than zero")]
    ZeroFailureThreshold,
    #[error("collection name for '{entity}' cannot be empty")]
    EmptyCollection { entity: &'static str },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Top-level error type for catalog operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("document in '{collection}' does not match the {entity} model: {source}")]
    Decode {
        collection: String,
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ServiceError {
    /// True when the failure comes from an open circuit breaker.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Search(error) if error.kind() == crate::search::SearchErrorKind::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_detected_through_search_errors() {
        let error = ServiceError::from(SearchError::unavailable("breaker open"));
        assert!(error.is_unavailable());

        let error = ServiceError::from(SearchError::transport("connection refused"));
        assert!(!error.is_unavailable());
    }

    #[test]
    fn config_errors_render_the_offending_key() {
        let error = ConfigError::InvalidValue {
            key: "CINEDEX_CACHE_TTL_SECS",
            value: String::from("soon"),
        };
        assert_eq!(
            error.to_string(),
            "invalid value 'soon' for CINEDEX_CACHE_TTL_SECS"
        );
    }
}
