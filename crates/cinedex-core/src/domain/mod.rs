//! # Domain Models
//!
//! Catalog entities as served to callers.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Film`] | Film with credits and genres |
//! | [`FilmShort`] | Id, title and rating of a film |
//! | [`Genre`] | Genre with optional description |
//! | [`Person`] | Person with the films they are credited in |
//! | [`PersonFilm`] | One film of a person and the roles held in it |
//! | [`PersonRole`] | `actor`, `director` or `writer` |
//!
//! All types round-trip through serde JSON without loss, which the cache
//! layer relies on.

mod film;
mod genre;
mod person;

pub use film::{Film, FilmShort, GenreRef, PersonRef};
pub use genre::Genre;
pub use person::{Person, PersonFilm, PersonRole};
