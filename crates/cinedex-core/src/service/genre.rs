use super::{Entity, EntityService};
use crate::domain::Genre;
use crate::query::QueryCategory;

impl Entity for Genre {
    const NAME: &'static str = "genre";
    const OPERATIONS: &'static str = "genres";
    // Genre search lists every genre; the text only takes part in the cache key.
    const SEARCH: QueryCategory = QueryCategory::GenreListing;
}

/// Genres need nothing beyond the generic operations.
pub type GenreService = EntityService<Genre>;
