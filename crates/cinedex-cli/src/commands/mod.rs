mod films;
mod genres;
mod persons;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use cinedex_core::{
    Cache, Catalog, CatalogConfig, ConfigError, InMemorySearchEngine, MemoryCache, RedisCache,
    ServiceError,
};
use serde_json::Value;
use tracing::{info, info_span, warn, Instrument};

use crate::cli::{Cli, Command, PagingArgs};
use crate::error::CliError;
use crate::metadata::{Envelope, Metadata, RequestId};

/// Build the catalog, run the selected command and release the catalog.
pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let request_id = RequestId::new_v4();
    let started = Instant::now();
    let catalog = build_catalog(cli.fixtures.as_deref())?;
    let engine = catalog.engine().kind();

    let outcome = dispatch(&cli.command, &catalog)
        .instrument(info_span!("command", %request_id, %engine))
        .await;
    let data = settle(outcome, catalog.shutdown().await)?;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(%request_id, latency_ms, "command complete");
    Ok(Envelope {
        meta: Metadata::new(request_id, engine, latency_ms),
        data,
    })
}

async fn dispatch(command: &Command, catalog: &Catalog) -> Result<Value, CliError> {
    match command {
        Command::Films(args) => films::run(&args.command, catalog).await,
        Command::Genres(args) => genres::run(&args.command, catalog).await,
        Command::Persons(args) => persons::run(&args.command, catalog).await,
    }
}

/// The command outcome wins; a failed shutdown is only logged.
fn settle(
    outcome: Result<Value, CliError>,
    shutdown: Result<(), ServiceError>,
) -> Result<Value, CliError> {
    if let Err(error) = shutdown {
        warn!(%error, "catalog shutdown failed");
    }
    outcome
}

/// In-memory engine over `fixtures` when given, Elasticsearch otherwise.
/// Redis caches across runs when `CINEDEX_REDIS_URL` is set.
fn build_catalog(fixtures: Option<&Path>) -> Result<Catalog, CliError> {
    let config = CatalogConfig::from_env()?;
    let cache = cache_for(&config)?;
    let builder = Catalog::builder().with_config(config).with_cache(cache);

    let builder = match fixtures {
        Some(path) => {
            info!(path = %path.display(), "serving from fixtures");
            let engine = InMemorySearchEngine::from_fixture_file(path)?;
            builder.with_engine(Arc::new(engine))
        }
        None => builder.with_default_elastic(),
    };
    Ok(builder.build()?)
}

fn cache_for(config: &CatalogConfig) -> Result<Arc<dyn Cache>, CliError> {
    let Some(url) = config.redis_url.as_deref() else {
        return Ok(Arc::new(MemoryCache::new()));
    };
    let cache = RedisCache::open(url).map_err(|_| ConfigError::InvalidValue {
        key: "CINEDEX_REDIS_URL",
        value: url.to_owned(),
    })?;
    info!(prefix = cache.prefix(), "caching in redis");
    Ok(Arc::new(cache))
}

/// Reject a page past the last one of `total` results. An empty collection
/// accepts any page.
fn ensure_page_in_range(total: u64, paging: PagingArgs) -> Result<(), CliError> {
    if total == 0 {
        return Ok(());
    }
    let last_page = total.div_ceil(u64::from(paging.page_size));
    if u64::from(paging.page_number) > last_page {
        return Err(CliError::PageOutOfRange {
            page_number: paging.page_number,
            last_page,
        });
    }
    Ok(())
}

fn found<T>(entity: &'static str, id: &str, value: Option<T>) -> Result<T, CliError> {
    value.ok_or_else(|| CliError::NotFound {
        entity,
        id: id.to_owned(),
    })
}
