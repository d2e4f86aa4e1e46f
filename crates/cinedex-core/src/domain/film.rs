use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::PersonRole;

/// Credited person as embedded in a film document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub full_name: String,
}

/// Genre as embedded in a film document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub creation_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
    #[serde(default)]
    pub directors: Vec<PersonRef>,
    #[serde(default)]
    pub actors: Vec<PersonRef>,
    #[serde(default)]
    pub writers: Vec<PersonRef>,
    #[serde(default)]
    pub genres: Vec<GenreRef>,
}

impl Film {
    fn credits(&self, role: PersonRole) -> &[PersonRef] {
        match role {
            PersonRole::Actor => &self.actors,
            PersonRole::Director => &self.directors,
            PersonRole::Writer => &self.writers,
        }
    }

    /// Roles `person_id` holds in this film, in [`PersonRole::ALL`] order.
    pub fn roles_of(&self, person_id: Uuid) -> Vec<PersonRole> {
        PersonRole::ALL
            .into_iter()
            .filter(|role| {
                self.credits(*role)
                    .iter()
                    .any(|person| person.id == person_id)
            })
            .collect()
    }

    pub fn short(&self) -> FilmShort {
        FilmShort {
            uuid: self.id,
            title: self.title.clone(),
            imdb_rating: self.imdb_rating,
        }
    }
}

/// Listing view of a film.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmShort {
    pub uuid: Uuid,
    pub title: String,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
}

impl From<&Film> for FilmShort {
    fn from(film: &Film) -> Self {
        film.short()
    }
}
