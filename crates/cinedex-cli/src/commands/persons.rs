use cinedex_core::Catalog;
use serde_json::Value;

use super::{ensure_page_in_range, found};
use crate::cli::PersonsCommand;
use crate::error::CliError;

pub async fn run(command: &PersonsCommand, catalog: &Catalog) -> Result<Value, CliError> {
    let persons = catalog.persons();

    match command {
        PersonsCommand::Search(args) => {
            let paging = args.paging;
            ensure_page_in_range(persons.count().await?, paging)?;
            let page = persons
                .search(args.query.trim(), paging.page_size, paging.page_number)
                .await?;
            Ok(serde_json::to_value(page)?)
        }
        PersonsCommand::Get(args) => {
            let person = found("person", &args.id, persons.get_by_id(&args.id).await?)?;
            Ok(serde_json::to_value(person)?)
        }
        // No page bound here: an unknown person or a page past the credits
        // is an empty list.
        PersonsCommand::Films(args) => {
            let paging = args.paging;
            let films = persons
                .films_by_person(&args.id, paging.page_size, paging.page_number)
                .await?;
            Ok(serde_json::to_value(films)?)
        }
    }
}
