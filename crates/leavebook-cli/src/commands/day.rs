use leavebook_core::util::local_today;
use leavebook_core::validation::parse_date;

use crate::cli::GlobalOptions;
use crate::commands::common::{open_refreshed_engine, print_records};
use crate::error::CliError;

pub async fn run_day(
    date: Option<&str>,
    as_json: bool,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let date = match date {
        Some(raw) => parse_date(raw)?,
        None => local_today(),
    };

    let engine = open_refreshed_engine(options).await?;
    let records = engine.by_date(date);
    print_records(&records, as_json, &format!("Nobody is on leave on {date}."))
}
