use std::sync::Arc;

use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::{EnrichDocument, EnrichFuture, Entity, EntityService};
use crate::domain::{Film, FilmShort, Person, PersonFilm};
use crate::query::{QueryBinder, QueryCategory, QueryConstructor, QueryParams};
use crate::search::Document;
use crate::ServiceError;

impl Entity for Person {
    const NAME: &'static str = "person";
    const OPERATIONS: &'static str = "persons";
    const SEARCH: QueryCategory = QueryCategory::PersonSearch;
}

/// Attaches `films` (with the roles held in each) to person documents.
#[derive(Clone)]
pub struct PersonFilmsEnrichment {
    films: EntityService<Film>,
    films_by_person: QueryConstructor,
}

impl PersonFilmsEnrichment {
    /// Films looked up per person: the first page of this size.
    pub const PAGE_SIZE: u32 = 50;

    pub fn new(films: EntityService<Film>, binder: &QueryBinder) -> Result<Self, ServiceError> {
        let films_by_person =
            binder.resolve(films.engine().kind(), QueryCategory::FilmsByPerson)?;
        Ok(Self {
            films,
            films_by_person,
        })
    }

    async fn person_films(&self, person_id: Uuid) -> Result<Vec<PersonFilm>, ServiceError> {
        let params = QueryParams::new(Some(person_id.to_string()), Self::PAGE_SIZE, 1)?;
        let query = self.films_by_person.construct(&params)?;
        let films = self.films.load(&query).await?;

        Ok(films
            .iter()
            .map(|film| PersonFilm {
                uuid: film.id,
                roles: film.roles_of(person_id),
            })
            .collect())
    }
}

impl EnrichDocument for PersonFilmsEnrichment {
    fn enrich<'a>(&'a self, mut document: Document) -> EnrichFuture<'a> {
        Box::pin(async move {
            // Documents without a usable id are left for the decoder to reject.
            let Some(person_id) = document
                .get("id")
                .and_then(|id| id.as_str())
                .and_then(|id| Uuid::parse_str(id).ok())
            else {
                return Ok(document);
            };

            let films = self.person_films(person_id).await?;
            debug!(%person_id, films = films.len(), "person enriched");
            if let Some(fields) = document.as_object_mut() {
                fields.insert(String::from("films"), json!(films));
            }
            Ok(document)
        })
    }
}

/// Person lookups, enriched with filmography, plus `films_by_person`.
#[derive(Clone)]
pub struct PersonService {
    persons: EntityService<Person>,
    films: EntityService<Film>,
    films_by_person: QueryConstructor,
}

impl PersonService {
    pub fn new(
        persons: EntityService<Person>,
        films: EntityService<Film>,
        binder: &QueryBinder,
    ) -> Result<Self, ServiceError> {
        let enrichment = PersonFilmsEnrichment::new(films.clone(), binder)?;
        let films_by_person = enrichment.films_by_person;
        Ok(Self {
            persons: persons.with_enrichment(Arc::new(enrichment)),
            films,
            films_by_person,
        })
    }

    pub fn entity(&self) -> &EntityService<Person> {
        &self.persons
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Person>, ServiceError> {
        self.persons.get_by_id(id).await
    }

    pub async fn search(
        &self,
        text: &str,
        page_size: u32,
        page_number: u32,
    ) -> Result<Vec<Person>, ServiceError> {
        self.persons.search(text, page_size, page_number).await
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        self.persons.count().await
    }

    /// Films crediting `person_id` in any role, as short views.
    pub async fn films_by_person(
        &self,
        person_id: &str,
        page_size: u32,
        page_number: u32,
    ) -> Result<Vec<FilmShort>, ServiceError> {
        let params = QueryParams::new(Some(person_id.to_owned()), page_size, page_number)?;

        self.persons
            .cache()
            .call(
                "persons.films_by_person",
                &(person_id, page_size, page_number),
                || async {
                    let query = self.films_by_person.construct(&params)?;
                    let films = self.films.load(&query).await?;
                    Ok::<_, ServiceError>(films.iter().map(Film::short).collect())
                },
            )
            .await
    }
}
