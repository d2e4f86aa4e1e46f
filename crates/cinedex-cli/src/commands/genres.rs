use cinedex_core::Catalog;
use serde_json::{json, Value};

use super::{ensure_page_in_range, found};
use crate::cli::GenresCommand;
use crate::error::CliError;

pub async fn run(command: &GenresCommand, catalog: &Catalog) -> Result<Value, CliError> {
    let genres = catalog.genres();

    match command {
        GenresCommand::List(paging) => {
            ensure_page_in_range(genres.count().await?, *paging)?;
            // Genre listings ignore the text; an empty string keeps one cache entry per page.
            let page = genres
                .search("", paging.page_size, paging.page_number)
                .await?;
            Ok(serde_json::to_value(page)?)
        }
        GenresCommand::Get(args) => {
            let genre = found("genre", &args.id, genres.get_by_id(&args.id).await?)?;
            Ok(serde_json::to_value(genre)?)
        }
        GenresCommand::Count => Ok(json!({ "count": genres.count().await? })),
    }
}
