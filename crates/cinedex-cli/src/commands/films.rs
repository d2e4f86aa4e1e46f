use cinedex_core::{Catalog, Film, FilmShort};
use serde_json::{json, Value};

use super::{ensure_page_in_range, found};
use crate::cli::FilmsCommand;
use crate::error::CliError;

pub async fn run(command: &FilmsCommand, catalog: &Catalog) -> Result<Value, CliError> {
    let films = catalog.films();

    match command {
        FilmsCommand::Search(args) => {
            let paging = args.paging;
            ensure_page_in_range(films.count().await?, paging)?;
            let page = films
                .search(args.query.trim(), paging.page_size, paging.page_number)
                .await?;
            Ok(serde_json::to_value(shorts(&page))?)
        }
        FilmsCommand::Popular(args) => {
            let paging = args.paging;
            ensure_page_in_range(films.count().await?, paging)?;
            let page = films
                .popular(
                    &args.sort,
                    paging.page_size,
                    paging.page_number,
                    args.genre.as_deref(),
                )
                .await?;
            if page.is_empty() {
                return Err(CliError::NoResults { entity: "films" });
            }
            Ok(serde_json::to_value(shorts(&page))?)
        }
        FilmsCommand::Get(args) => {
            let film = found("film", &args.id, films.get_by_id(&args.id).await?)?;
            Ok(serde_json::to_value(film)?)
        }
        FilmsCommand::Count => Ok(json!({ "count": films.count().await? })),
    }
}

fn shorts(films: &[Film]) -> Vec<FilmShort> {
    films.iter().map(FilmShort::from).collect()
}
