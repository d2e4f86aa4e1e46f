use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::ConfigError;

/// Collection names per entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub films: String,
    pub genres: String,
    pub persons: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            films: String::from("film"),
            genres: String::from("genre"),
            persons: String::from("person"),
        }
    }
}

impl Collections {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (entity, name) in [
            ("film", &self.films),
            ("genre", &self.genres),
            ("person", &self.persons),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyCollection { entity });
            }
        }
        Ok(())
    }
}

/// Elasticsearch connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: String::from("http://127.0.0.1:9200"),
            api_key: None,
            timeout_ms: 3_000,
        }
    }
}

/// Settings consumed by [`crate::CatalogBuilder`].
///
/// # Environment Variables
///
/// | Variable | Default |
/// |----------|---------|
/// | `CINEDEX_CACHE_TTL_SECS` | `1800` |
/// | `CINEDEX_REDIS_URL` | unset (in-process cache) |
/// | `CINEDEX_BREAKER_ENABLED` | `true` |
/// | `CINEDEX_BREAKER_FAILURE_THRESHOLD` | `3` |
/// | `CINEDEX_BREAKER_RECOVERY_SECS` | `10` |
/// | `CINEDEX_ELASTIC_URL` | `http://127.0.0.1:9200` |
/// | `CINEDEX_ELASTIC_API_KEY` | unset |
/// | `CINEDEX_ELASTIC_TIMEOUT_MS` | `3000` |
/// | `CINEDEX_FILMS_COLLECTION` | `film` |
/// | `CINEDEX_GENRES_COLLECTION` | `genre` |
/// | `CINEDEX_PERSONS_COLLECTION` | `person` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub cache_ttl: Duration,
    /// Shared Redis cache; `None` keeps entries in process.
    pub redis_url: Option<String>,
    pub breaker_enabled: bool,
    pub breaker: CircuitBreakerConfig,
    pub collections: Collections,
    pub elastic: ElasticConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            redis_url: None,
            breaker_enabled: true,
            breaker: CircuitBreakerConfig::default(),
            collections: Collections::default(),
            elastic: ElasticConfig::default(),
        }
    }
}

impl CatalogConfig {
    /// Defaults overridden by `CINEDEX_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parsed::<u64, _>(&lookup, "CINEDEX_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        config.redis_url = lookup("CINEDEX_REDIS_URL").filter(|url| !url.trim().is_empty());
        if let Some(enabled) = flag(&lookup, "CINEDEX_BREAKER_ENABLED")? {
            config.breaker_enabled = enabled;
        }
        if let Some(threshold) = parsed(&lookup, "CINEDEX_BREAKER_FAILURE_THRESHOLD")? {
            config.breaker.failure_threshold = threshold;
        }
        if let Some(secs) = parsed(&lookup, "CINEDEX_BREAKER_RECOVERY_SECS")? {
            config.breaker.recovery_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = lookup("CINEDEX_ELASTIC_URL") {
            config.elastic.url = url;
        }
        config.elastic.api_key = lookup("CINEDEX_ELASTIC_API_KEY").filter(|key| !key.is_empty());
        if let Some(timeout_ms) = parsed(&lookup, "CINEDEX_ELASTIC_TIMEOUT_MS")? {
            config.elastic.timeout_ms = timeout_ms;
        }
        if let Some(name) = lookup("CINEDEX_FILMS_COLLECTION") {
            config.collections.films = name;
        }
        if let Some(name) = lookup("CINEDEX_GENRES_COLLECTION") {
            config.collections.genres = name;
        }
        if let Some(name) = lookup("CINEDEX_PERSONS_COLLECTION") {
            config.collections.persons = name;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroCacheTtl);
        }
        self.breaker.validate()?;
        self.collections.validate()
    }
}

fn parsed<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        })
        .transpose()
}

fn flag<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key, value }),
        })
        .transpose()
}
