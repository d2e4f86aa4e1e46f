use super::{Entity, EntityService};
use crate::domain::Film;
use crate::query::{QueryBinder, QueryCategory, QueryConstructor, QueryParams, SortKey};
use crate::ServiceError;

impl Entity for Film {
    const NAME: &'static str = "film";
    const OPERATIONS: &'static str = "films";
    const SEARCH: QueryCategory = QueryCategory::FilmSearch;
}

/// Film lookups plus the sorted `popular` listing.
#[derive(Clone)]
pub struct FilmService {
    films: EntityService<Film>,
    popular: QueryConstructor,
}

impl FilmService {
    pub fn new(films: EntityService<Film>, binder: &QueryBinder) -> Result<Self, ServiceError> {
        let popular = binder.resolve(films.engine().kind(), QueryCategory::PopularFilms)?;
        Ok(Self { films, popular })
    }

    pub fn entity(&self) -> &EntityService<Film> {
        &self.films
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Film>, ServiceError> {
        self.films.get_by_id(id).await
    }

    pub async fn search(
        &self,
        text: &str,
        page_size: u32,
        page_number: u32,
    ) -> Result<Vec<Film>, ServiceError> {
        self.films.search(text, page_size, page_number).await
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        self.films.count().await
    }

    /// Films ordered by `sort`, optionally restricted to one genre id.
    pub async fn popular(
        &self,
        sort: &SortKey,
        page_size: u32,
        page_number: u32,
        genre_id: Option<&str>,
    ) -> Result<Vec<Film>, ServiceError> {
        let params = QueryParams::new(genre_id.map(str::to_owned), page_size, page_number)?
            .with_sort(sort.clone());
        let sort_token = sort.to_string();

        self.films
            .cache()
            .call(
                "films.popular",
                &(sort_token.as_str(), page_size, page_number, genre_id),
                || async {
                    let query = self.popular.construct(&params)?;
                    self.films.load(&query).await
                },
            )
            .await
    }
}
