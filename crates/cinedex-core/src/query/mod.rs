//! Engine-agnostic query descriptions.
//!
//! A [`QuerySpec`] says *what* to look up; the [`QueryBinder`] decides which
//! engine-specific builder produces it. Generic code only ever deals with
//! [`QueryCategory`] and [`QueryParams`], never with a concrete engine.
//!
//! | Category | Input | Description |
//! |----------|-------|-------------|
//! | [`QueryCategory::FilmSearch`] | text | Full-text over title and credits |
//! | [`QueryCategory::PopularFilms`] | sort, optional genre id | Sorted listing |
//! | [`QueryCategory::GenreListing`] | - | Every genre, paginated |
//! | [`QueryCategory::PersonSearch`] | text | Name match |
//! | [`QueryCategory::FilmsByPerson`] | person id | Films crediting a person |

mod binder;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::search::memory::MemoryQuery;
use crate::search::EngineKind;
use crate::ValidationError;

pub use binder::{BindingError, QueryBinder, QueryBinding, QueryBuilder, QueryConstructor};

/// Logical lookup kind, independent of the engine that executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    FilmSearch,
    PopularFilms,
    GenreListing,
    PersonSearch,
    FilmsByPerson,
}

impl QueryCategory {
    pub const ALL: [Self; 5] = [
        Self::FilmSearch,
        Self::PopularFilms,
        Self::GenreListing,
        Self::PersonSearch,
        Self::FilmsByPerson,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FilmSearch => "film_search",
            Self::PopularFilms => "popular_films",
            Self::GenreListing => "genre_listing",
            Self::PersonSearch => "person_search",
            Self::FilmsByPerson => "films_by_person",
        }
    }
}

impl Display for QueryCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of leading results skipped for a page.
///
/// Every query category paginates through this function.
pub const fn page_offset(page_number: u32, page_size: u32) -> u64 {
    (page_number as u64 - 1) * page_size as u64
}

/// Sort direction parsed from a sort token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sort token such as `-imdb_rating`: a leading `-` means descending.
///
/// Whether the field exists is checked upstream, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SortKey {
    field: String,
    order: SortOrder,
}

impl SortKey {
    pub fn parse(token: &str) -> Result<Self, ValidationError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ValidationError::EmptySortKey);
        }

        let (field, order) = match token.strip_prefix('-') {
            Some(rest) => (rest, SortOrder::Desc),
            None => (token, SortOrder::Asc),
        };
        if field.is_empty() {
            return Err(ValidationError::SortKeyWithoutField {
                value: token.to_owned(),
            });
        }

        Ok(Self {
            field: field.to_owned(),
            order,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub const fn order(&self) -> SortOrder {
        self.order
    }

    pub const fn is_descending(&self) -> bool {
        matches!(self.order, SortOrder::Desc)
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_descending() {
            f.write_str("-")?;
        }
        f.write_str(&self.field)
    }
}

impl TryFrom<String> for SortKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SortKey> for String {
    fn from(value: SortKey) -> Self {
        value.to_string()
    }
}

/// Paging and filter input for a query.
///
/// With a sort key attached this is the sortable variant used by
/// [`QueryCategory::PopularFilms`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryParams {
    query: Option<String>,
    page_size: u32,
    page_number: u32,
    sort: Option<SortKey>,
}

impl QueryParams {
    pub fn new(
        query: Option<String>,
        page_size: u32,
        page_number: u32,
    ) -> Result<Self, ValidationError> {
        if page_size == 0 {
            return Err(ValidationError::ZeroPageSize);
        }
        if page_number == 0 {
            return Err(ValidationError::ZeroPageNumber);
        }
        Ok(Self {
            query,
            page_size,
            page_number,
            sort: None,
        })
    }

    /// Build sortable params from a raw sort token.
    pub fn sortable(
        query: Option<String>,
        page_size: u32,
        page_number: u32,
        sort: &str,
    ) -> Result<Self, ValidationError> {
        let sort = SortKey::parse(sort)?;
        Ok(Self::new(query, page_size, page_number)?.with_sort(sort))
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    pub const fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn sort(&self) -> Option<&SortKey> {
        self.sort.as_ref()
    }

    pub const fn offset(&self) -> u64 {
        page_offset(self.page_number, self.page_size)
    }

    pub fn require_query(&self, category: QueryCategory) -> Result<&str, ValidationError> {
        self.query
            .as_deref()
            .ok_or(ValidationError::MissingQueryText {
                category: category.as_str(),
            })
    }

    pub fn require_sort(&self, category: QueryCategory) -> Result<&SortKey, ValidationError> {
        self.sort.as_ref().ok_or(ValidationError::MissingSortKey {
            category: category.as_str(),
        })
    }
}

/// Engine-native query body.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPayload {
    /// Elasticsearch request body for `_search`.
    Elastic(serde_json::Value),
    /// Filter/sort/window evaluated by [`crate::search::InMemorySearchEngine`].
    Memory(MemoryQuery),
}

/// Immutable description of one lookup, bound to a single engine.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    category: QueryCategory,
    engine: EngineKind,
    payload: QueryPayload,
}

impl QuerySpec {
    pub(crate) fn new(category: QueryCategory, engine: EngineKind, payload: QueryPayload) -> Self {
        Self {
            category,
            engine,
            payload,
        }
    }

    pub const fn category(&self) -> QueryCategory {
        self.category
    }

    /// Engine this spec was built for.
    pub const fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn payload(&self) -> &QueryPayload {
        &self.payload
    }
}
