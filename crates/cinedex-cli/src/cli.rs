//! CLI argument definitions for cinedex.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `films search` | Full-text film search |
//! | `films popular` | Films ordered by a sort key, optionally one genre |
//! | `films get` | One film by id |
//! | `films count` | Number of indexed films |
//! | `genres list` | Page through genres |
//! | `genres get` | One genre by id |
//! | `genres count` | Number of indexed genres |
//! | `persons search` | Name search over people |
//! | `persons get` | One person by id, with filmography |
//! | `persons films` | Films crediting a person |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--fixtures` | unset | Serve from a JSON fixture file instead of Elasticsearch |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--log-json` | `false` | Emit logs as JSON lines on stderr |
//!
//! # Examples
//!
//! ```bash
//! cinedex films search "star voyage" --page-size 10
//! cinedex films popular --sort=-imdb_rating --genre 5e0c9a2b-1c2d-4e3f-8a9b-0c1d2e3f4a01
//! cinedex --fixtures catalog.json persons get 0b7f4b5e-5d0c-4d53-8a35-6f5a1d1f0a01 --pretty
//! ```

use std::path::PathBuf;

use cinedex_core::SortKey;
use clap::{Args, Parser, Subcommand};

/// Largest page a listing command returns.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Fields listings may be ordered by.
pub const SORT_FIELDS: [&str; 3] = ["imdb_rating", "title", "creation_date"];

/// Cached lookups of films, genres and people from a search index.
#[derive(Debug, Parser)]
#[command(
    name = "cinedex",
    author,
    version,
    about = "Film catalog lookups over a search index",
    long_about = "cinedex answers film, genre and person lookups from an Elasticsearch \
index (CINEDEX_ELASTIC_URL) or a local JSON fixture file. Results are cached in Redis \
when CINEDEX_REDIS_URL is set, otherwise for the duration of the command, and the \
backend is guarded by a circuit breaker.\n\
\n\
Use 'cinedex <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Serve from a JSON fixture file (`{"film": [...], "genre": [...], "person": [...]}`).
    #[arg(long, global = true)]
    pub fixtures: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Film lookups.
    Films(FilmsArgs),

    /// Genre lookups.
    Genres(GenresArgs),

    /// Person lookups.
    Persons(PersonsArgs),
}

#[derive(Debug, Args)]
pub struct FilmsArgs {
    #[command(subcommand)]
    pub command: FilmsCommand,
}

#[derive(Debug, Subcommand)]
pub enum FilmsCommand {
    /// Full-text search over titles and credits.
    ///
    /// # Examples
    ///
    ///   cinedex films search star
    ///   cinedex films search "quiet harbor" --page-size 5 --page-number 2
    Search(SearchArgs),

    /// Films ordered by a sort key.
    ///
    /// # Examples
    ///
    ///   cinedex films popular
    ///   cinedex films popular --sort title --genre <genre-uuid>
    Popular(PopularArgs),

    /// One film by id.
    Get(GetArgs),

    /// Number of indexed films.
    Count,
}

#[derive(Debug, Args)]
pub struct GenresArgs {
    #[command(subcommand)]
    pub command: GenresCommand,
}

#[derive(Debug, Subcommand)]
pub enum GenresCommand {
    /// Page through all genres.
    List(PagingArgs),

    /// One genre by id.
    Get(GetArgs),

    /// Number of indexed genres.
    Count,
}

#[derive(Debug, Args)]
pub struct PersonsArgs {
    #[command(subcommand)]
    pub command: PersonsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PersonsCommand {
    /// Search people by name.
    Search(SearchArgs),

    /// One person by id, with the films they are credited in.
    Get(GetArgs),

    /// Films crediting a person in any role.
    Films(PersonFilmsArgs),
}

/// Page window shared by every listing command.
#[derive(Debug, Clone, Copy, Args)]
pub struct PagingArgs {
    /// Results per page (1-50).
    #[arg(long, default_value_t = MAX_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PAGE_SIZE)))]
    pub page_size: u32,

    /// Page to return, starting at 1.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_number: u32,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-text query.
    pub query: String,

    #[command(flatten)]
    pub paging: PagingArgs,
}

#[derive(Debug, Args)]
pub struct PopularArgs {
    /// Sort token: `imdb_rating`, `title` or `creation_date`, prefixed with `-` for descending.
    #[arg(long, default_value = "-imdb_rating", allow_hyphen_values = true, value_parser = parse_sort)]
    pub sort: SortKey,

    /// Restrict to films of this genre id.
    #[arg(long)]
    pub genre: Option<String>,

    #[command(flatten)]
    pub paging: PagingArgs,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Document id.
    pub id: String,
}

#[derive(Debug, Args)]
pub struct PersonFilmsArgs {
    /// Person id.
    pub id: String,

    #[command(flatten)]
    pub paging: PagingArgs,
}

fn parse_sort(value: &str) -> Result<SortKey, String> {
    let sort = SortKey::parse(value).map_err(|error| error.to_string())?;
    if SORT_FIELDS.contains(&sort.field()) {
        Ok(sort)
    } else {
        Err(format!(
            "unknown sort field '{}', expected one of: {}",
            sort.field(),
            SORT_FIELDS.join(", ")
        ))
    }
}
