use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use super::{ensure_engine, Document, EngineKind, SearchEngine, SearchError, SearchFuture};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::query::{QueryBuilder, QueryCategory, QueryParams, QueryPayload, QuerySpec};
use crate::ValidationError;

const FILM_SEARCH_FIELDS: [&str; 4] = ["title", "directors", "actors", "writers"];
const CREDIT_PATHS: [&str; 3] = ["actors", "writers", "directors"];

/// [`SearchEngine`] over the Elasticsearch REST API.
#[derive(Clone)]
pub struct ElasticSearchEngine {
    base_url: String,
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    timeout_ms: u64,
}

impl ElasticSearchEngine {
    pub fn new(base_url: impl Into<String>, http_client: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            base_url,
            http_client,
            auth: HttpAuth::None,
            timeout_ms: 3_000,
        }
    }

    pub fn with_auth(mut self, auth: HttpAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, collection: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(collection),
            path
        )
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SearchError> {
        let request = request
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);
        debug!(method = request.method.as_str(), url = %request.url, "elastic request");

        self.http_client
            .execute(request)
            .await
            .map_err(|error| SearchError::transport(format!("elastic transport error: {error}")))
    }
}

impl SearchEngine for ElasticSearchEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Elastic
    }

    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> SearchFuture<'a, Option<Document>> {
        Box::pin(async move {
            let url = self.url(collection, &format!("_doc/{}", urlencoding::encode(id)));
            let response = self.send(HttpRequest::get(url)).await?;
            if response.is_not_found() {
                return Ok(None);
            }
            let mut body = parse_body(&response, "get")?;

            if body.get("found").and_then(Value::as_bool) == Some(false) {
                return Ok(None);
            }
            match body.get_mut("_source") {
                Some(source) => Ok(Some(source.take())),
                None => Err(SearchError::malformed(
                    "elastic get response has no '_source'",
                )),
            }
        })
    }

    fn search<'a>(
        &'a self,
        collection: &'a str,
        query: &'a QuerySpec,
    ) -> SearchFuture<'a, Vec<Document>> {
        Box::pin(async move {
            ensure_engine(EngineKind::Elastic, query)?;
            let QueryPayload::Elastic(request_body) = query.payload() else {
                return Err(SearchError::internal(
                    "elastic query spec does not carry an elastic request body",
                ));
            };
            debug!(category = %query.category(), query = %request_body, "elastic search");

            let request = HttpRequest::post(self.url(collection, "_search")).with_json_body(request_body);
            let response = self.send(request).await?;
            if response.is_not_found() {
                return Ok(Vec::new());
            }
            let mut body = parse_body(&response, "search")?;

            let hits = body
                .pointer_mut("/hits/hits")
                .and_then(Value::as_array_mut)
                .ok_or_else(|| SearchError::malformed("elastic search response has no 'hits.hits'"))?;

            hits.iter_mut()
                .map(|hit| {
                    hit.get_mut("_source").map(Value::take).ok_or_else(|| {
                        SearchError::malformed("elastic search hit has no '_source'")
                    })
                })
                .collect()
        })
    }

    fn count<'a>(&'a self, collection: &'a str) -> SearchFuture<'a, u64> {
        Box::pin(async move {
            let response = self.send(HttpRequest::get(self.url(collection, "_count"))).await?;
            if response.is_not_found() {
                return Ok(0);
            }
            let body = parse_body(&response, "count")?;

            body.get("count")
                .and_then(Value::as_u64)
                .ok_or_else(|| SearchError::malformed("elastic count response has no 'count'"))
        })
    }
}

fn parse_body(response: &HttpResponse, operation: &str) -> Result<Value, SearchError> {
    if !response.is_success() {
        return Err(SearchError::transport(format!(
            "elastic {operation} returned status {}",
            response.status
        )));
    }
    serde_json::from_str(&response.body).map_err(|error| {
        SearchError::malformed(format!("elastic {operation} response is not JSON: {error}"))
    })
}

fn windowed(query: Value, params: &QueryParams) -> Value {
    json!({
        "query": query,
        "from": params.offset(),
        "size": params.page_size(),
    })
}

/// `multi_match` over title and credits.
pub struct ElasticFilmSearch;

impl QueryBuilder for ElasticFilmSearch {
    const ENGINE: EngineKind = EngineKind::Elastic;
    const CATEGORY: QueryCategory = QueryCategory::FilmSearch;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        let text = params.require_query(Self::CATEGORY)?;
        Ok(QueryPayload::Elastic(windowed(
            json!({
                "multi_match": {
                    "query": text,
                    "fields": FILM_SEARCH_FIELDS,
                    "type": "best_fields",
                }
            }),
            params,
        )))
    }
}

/// Sorted film listing, optionally restricted to one genre id.
pub struct ElasticPopularFilms;

impl QueryBuilder for ElasticPopularFilms {
    const ENGINE: EngineKind = EngineKind::Elastic;
    const CATEGORY: QueryCategory = QueryCategory::PopularFilms;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        let sort = params.require_sort(Self::CATEGORY)?;

        let mut bool_query = json!({ "must": [{ "match_all": {} }] });
        if let Some(genre_id) = params.query().filter(|genre_id| !genre_id.is_empty()) {
            bool_query["filter"] = json!([{
                "nested": {
                    "path": "genres",
                    "query": { "term": { "genres.id": genre_id } },
                }
            }]);
        }

        let mut body = windowed(json!({ "bool": bool_query }), params);
        body["sort"] = json!([{ sort.field(): { "order": sort.order().as_str() } }]);
        Ok(QueryPayload::Elastic(body))
    }
}

pub struct ElasticGenreListing;

impl QueryBuilder for ElasticGenreListing {
    const ENGINE: EngineKind = EngineKind::Elastic;
    const CATEGORY: QueryCategory = QueryCategory::GenreListing;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        Ok(QueryPayload::Elastic(windowed(
            json!({ "match_all": {} }),
            params,
        )))
    }
}

pub struct ElasticPersonSearch;

impl QueryBuilder for ElasticPersonSearch {
    const ENGINE: EngineKind = EngineKind::Elastic;
    const CATEGORY: QueryCategory = QueryCategory::PersonSearch;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        let text = params.require_query(Self::CATEGORY)?;
        Ok(QueryPayload::Elastic(windowed(
            json!({ "match": { "full_name": text } }),
            params,
        )))
    }
}

/// Films where the person id appears under any credit path.
pub struct ElasticFilmsByPerson;

impl QueryBuilder for ElasticFilmsByPerson {
    const ENGINE: EngineKind = EngineKind::Elastic;
    const CATEGORY: QueryCategory = QueryCategory::FilmsByPerson;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        let person_id = params.require_query(Self::CATEGORY)?;
        let should = CREDIT_PATHS
            .iter()
            .map(|path| {
                json!({
                    "nested": {
                        "path": path,
                        "query": { "term": { format!("{path}.id"): person_id } },
                    }
                })
            })
            .collect::<Vec<_>>();

        Ok(QueryPayload::Elastic(windowed(
            json!({ "bool": { "should": should } }),
            params,
        )))
    }
}
