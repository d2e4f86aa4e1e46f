use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use thiserror::Error;

use super::{ensure_engine, Document, EngineKind, SearchEngine, SearchError, SearchFuture};
use crate::query::{QueryBuilder, QueryCategory, QueryParams, QueryPayload, QuerySpec, SortKey};
use crate::ValidationError;

/// Document predicate evaluated by the in-memory engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryFilter {
    All,
    /// Any word of `text` appears, case-insensitively, in any of `fields`.
    Text { fields: Vec<String>, text: String },
    /// An element of any array at `paths` has `"id" == id`.
    Related { paths: Vec<String>, id: String },
}

/// Query payload for [`InMemorySearchEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryQuery {
    pub filter: MemoryFilter,
    pub sort: Option<SortKey>,
    pub offset: u64,
    pub limit: u32,
}

impl MemoryQuery {
    fn windowed(filter: MemoryFilter, params: &QueryParams) -> Self {
        Self {
            filter,
            sort: None,
            offset: params.offset(),
            limit: params.page_size(),
        }
    }
}

/// Failure loading a fixture file.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("fixture is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("fixture must be an object mapping collection names to arrays of documents")]
    Shape,
}

/// Process-local engine over documents grouped by collection.
///
/// Documents are addressed by their `"id"` field.
#[derive(Debug, Default)]
pub struct InMemorySearchEngine {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(self, name: impl Into<String>, documents: Vec<Document>) -> Self {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), documents);
        self
    }

    pub fn insert(&self, collection: &str, document: Document) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_owned())
            .or_default()
            .push(document);
    }

    /// Parse `{"<collection>": [document, ...], ...}`.
    pub fn from_fixture_str(fixture: &str) -> Result<Self, FixtureError> {
        let Value::Object(map) = serde_json::from_str(fixture)? else {
            return Err(FixtureError::Shape);
        };

        let mut collections = HashMap::with_capacity(map.len());
        for (name, documents) in map {
            let Value::Array(documents) = documents else {
                return Err(FixtureError::Shape);
            };
            collections.insert(name, documents);
        }

        Ok(Self {
            collections: RwLock::new(collections),
        })
    }

    pub fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let fixture = std::fs::read_to_string(path)?;
        Self::from_fixture_str(&fixture)
    }

    fn run(&self, collection: &str, query: &MemoryQuery) -> Vec<Document> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(documents) = collections.get(collection) else {
            return Vec::new();
        };

        let mut matched = documents
            .iter()
            .filter(|document| matches_filter(document, &query.filter))
            .collect::<Vec<_>>();

        if let Some(sort) = &query.sort {
            matched.sort_by(|left, right| {
                compare_field(left.get(sort.field()), right.get(sort.field()), sort)
            });
        }

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        matched
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .cloned()
            .collect()
    }
}

impl SearchEngine for InMemorySearchEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Memory
    }

    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> SearchFuture<'a, Option<Document>> {
        Box::pin(async move {
            let collections = self
                .collections
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            Ok(collections.get(collection).and_then(|documents| {
                documents
                    .iter()
                    .find(|document| document.get("id").and_then(Value::as_str) == Some(id))
                    .cloned()
            }))
        })
    }

    fn search<'a>(
        &'a self,
        collection: &'a str,
        query: &'a QuerySpec,
    ) -> SearchFuture<'a, Vec<Document>> {
        Box::pin(async move {
            ensure_engine(EngineKind::Memory, query)?;
            let QueryPayload::Memory(memory_query) = query.payload() else {
                return Err(SearchError::internal(
                    "memory query spec does not carry a memory query",
                ));
            };
            Ok(self.run(collection, memory_query))
        })
    }

    fn count<'a>(&'a self, collection: &'a str) -> SearchFuture<'a, u64> {
        Box::pin(async move {
            let collections = self
                .collections
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            Ok(collections
                .get(collection)
                .map_or(0, |documents| documents.len() as u64))
        })
    }
}

fn matches_filter(document: &Document, filter: &MemoryFilter) -> bool {
    match filter {
        MemoryFilter::All => true,
        MemoryFilter::Text { fields, text } => {
            let needles = words(text);
            if needles.is_empty() {
                return false;
            }
            fields.iter().any(|field| {
                let mut haystack = Vec::new();
                if let Some(value) = document.get(field) {
                    collect_words(value, &mut haystack);
                }
                needles.iter().any(|needle| haystack.contains(needle))
            })
        }
        MemoryFilter::Related { paths, id } => paths.iter().any(|path| {
            document
                .get(path)
                .and_then(Value::as_array)
                .is_some_and(|related| {
                    related
                        .iter()
                        .any(|item| item.get("id").and_then(Value::as_str) == Some(id.as_str()))
                })
        }),
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn collect_words(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => out.extend(words(text)),
        Value::Array(items) => items.iter().for_each(|item| collect_words(item, out)),
        Value::Object(fields) => fields
            .iter()
            .filter(|(name, _)| name.as_str() != "id")
            .for_each(|(_, item)| collect_words(item, out)),
        _ => {}
    }
}

/// Missing and null values sort last in both directions.
fn compare_field(left: Option<&Value>, right: Option<&Value>, sort: &SortKey) -> Ordering {
    let left = left.filter(|value| !value.is_null());
    let right = right.filter(|value| !value.is_null());

    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => {
            let ordering = compare_values(left, right);
            if sort.is_descending() {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            let left = left.as_f64().unwrap_or(f64::NAN);
            let right = right.as_f64().unwrap_or(f64::NAN);
            left.total_cmp(&right)
        }
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        _ => Ordering::Equal,
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

pub struct MemoryFilmSearch;

impl QueryBuilder for MemoryFilmSearch {
    const ENGINE: EngineKind = EngineKind::Memory;
    const CATEGORY: QueryCategory = QueryCategory::FilmSearch;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        let text = params.require_query(Self::CATEGORY)?;
        Ok(QueryPayload::Memory(MemoryQuery::windowed(
            MemoryFilter::Text {
                fields: strings(&["title", "directors", "actors", "writers"]),
                text: text.to_owned(),
            },
            params,
        )))
    }
}

pub struct MemoryPopularFilms;

impl QueryBuilder for MemoryPopularFilms {
    const ENGINE: EngineKind = EngineKind::Memory;
    const CATEGORY: QueryCategory = QueryCategory::PopularFilms;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        let sort = params.require_sort(Self::CATEGORY)?.clone();
        let filter = match params.query().filter(|genre_id| !genre_id.is_empty()) {
            Some(genre_id) => MemoryFilter::Related {
                paths: strings(&["genres"]),
                id: genre_id.to_owned(),
            },
            None => MemoryFilter::All,
        };

        let mut query = MemoryQuery::windowed(filter, params);
        query.sort = Some(sort);
        Ok(QueryPayload::Memory(query))
    }
}

pub struct MemoryGenreListing;

impl QueryBuilder for MemoryGenreListing {
    const ENGINE: EngineKind = EngineKind::Memory;
    const CATEGORY: QueryCategory = QueryCategory::GenreListing;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        Ok(QueryPayload::Memory(MemoryQuery::windowed(
            MemoryFilter::All,
            params,
        )))
    }
}

pub struct MemoryPersonSearch;

impl QueryBuilder for MemoryPersonSearch {
    const ENGINE: EngineKind = EngineKind::Memory;
    const CATEGORY: QueryCategory = QueryCategory::PersonSearch;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        let text = params.require_query(Self::CATEGORY)?;
        Ok(QueryPayload::Memory(MemoryQuery::windowed(
            MemoryFilter::Text {
                fields: strings(&["full_name"]),
                text: text.to_owned(),
            },
            params,
        )))
    }
}

pub struct MemoryFilmsByPerson;

impl QueryBuilder for MemoryFilmsByPerson {
    const ENGINE: EngineKind = EngineKind::Memory;
    const CATEGORY: QueryCategory = QueryCategory::FilmsByPerson;

    fn build(params: &QueryParams) -> Result<QueryPayload, ValidationError> {
        let person_id = params.require_query(Self::CATEGORY)?;
        Ok(QueryPayload::Memory(MemoryQuery::windowed(
            MemoryFilter::Related {
                paths: strings(&["actors", "writers", "directors"]),
                id: person_id.to_owned(),
            },
            params,
        )))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::QueryBinder;

    fn spec(category: QueryCategory, params: &QueryParams) -> QuerySpec {
        QueryBinder::standard()
            .resolve(EngineKind::Memory, category)
            .expect("binding exists")
            .construct(params)
            .expect("spec builds")
    }

    fn films() -> InMemorySearchEngine {
        InMemorySearchEngine::new().with_collection(
            "film",
            vec![
                json!({
                    "id": "f1", "title": "Star Quest", "imdb_rating": 7.1,
                    "genres": [{ "id": "g-scifi", "name": "Sci-Fi" }],
                    "actors": [{ "id": "p1", "full_name": "Ann Lee" }],
                    "writers": [], "directors": []
                }),
                json!({
                    "id": "f2", "title": "Quiet Harbor", "imdb_rating": 8.4,
                    "genres": [{ "id": "g-drama", "name": "Drama" }],
                    "actors": [], "writers": [{ "id": "p1", "full_name": "Ann Lee" }],
                    "directors": []
                }),
                json!({
                    "id": "f3", "title": "Lone Star", "imdb_rating": null,
                    "genres": [{ "id": "g-scifi", "name": "Sci-Fi" }],
                    "actors": [], "writers": [], "directors": []
                }),
            ],
        )
    }

    #[tokio::test]
    async fn get_finds_documents_by_id() {
        let engine = films();
        let film = engine.get("film", "f2").await.expect("get succeeds");
        assert_eq!(film.expect("present")["title"], "Quiet Harbor");

        assert!(engine.get("film", "nope").await.expect("get succeeds").is_none());
        assert!(engine.get("missing", "f2").await.expect("get succeeds").is_none());
    }

    #[tokio::test]
    async fn text_search_matches_whole_words_case_insensitively() {
        let engine = films();
        let params = QueryParams::new(Some(String::from("STAR")), 10, 1).expect("valid params");

        let hits = engine
            .search("film", &spec(QueryCategory::FilmSearch, &params))
            .await
            .expect("search succeeds");
        let ids = hits.iter().map(|hit| hit["id"].clone()).collect::<Vec<_>>();
        assert_eq!(ids, vec![json!("f1"), json!("f3")]);
    }

    #[tokio::test]
    async fn popular_sorts_descending_with_nulls_last() {
        let engine = films();
        let params = QueryParams::sortable(None, 10, 1, "-imdb_rating").expect("valid params");

        let hits = engine
            .search("film", &spec(QueryCategory::PopularFilms, &params))
            .await
            .expect("search succeeds");
        let ids = hits.iter().map(|hit| hit["id"].clone()).collect::<Vec<_>>();
        assert_eq!(ids, vec![json!("f2"), json!("f1"), json!("f3")]);
    }

    #[tokio::test]
    async fn popular_filters_by_genre_and_pages() {
        let engine = films();
        let params = QueryParams::sortable(Some(String::from("g-scifi")), 1, 2, "title")
            .expect("valid params");

        let hits = engine
            .search("film", &spec(QueryCategory::PopularFilms, &params))
            .await
            .expect("search succeeds");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], "f1");
    }

    #[tokio::test]
    async fn films_by_person_checks_every_credit() {
        let engine = films();
        let params = QueryParams::new(Some(String::from("p1")), 50, 1).expect("valid params");

        let hits = engine
            .search("film", &spec(QueryCategory::FilmsByPerson, &params))
            .await
            .expect("search succeeds");
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn missing_collection_counts_zero_and_searches_empty() {
        let engine = InMemorySearchEngine::new();
        assert_eq!(engine.count("genre").await.expect("count succeeds"), 0);

        let params = QueryParams::new(None, 10, 1).expect("valid params");
        let hits = engine
            .search("genre", &spec(QueryCategory::GenreListing, &params))
            .await
            .expect("search succeeds");
        assert!(hits.is_empty());
    }

    #[test]
    fn fixture_must_map_collections_to_arrays() {
        let engine = InMemorySearchEngine::from_fixture_str(r#"{"genre": [{"id": "g1"}]}"#)
            .expect("fixture loads");
        assert_eq!(
            engine
                .collections
                .read()
                .expect("lock")
                .get("genre")
                .map(Vec::len),
            Some(1)
        );

        assert!(matches!(
            InMemorySearchEngine::from_fixture_str(r#"{"genre": {"id": "g1"}}"#),
            Err(FixtureError::Shape)
        ));
        assert!(matches!(
            InMemorySearchEngine::from_fixture_str("[]"),
            Err(FixtureError::Shape)
        ));
    }
}
