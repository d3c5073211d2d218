use leavebook_core::util::local_today;

use crate::cli::GlobalOptions;
use crate::commands::common::{current_month, open_refreshed_engine, parse_month, print_records};
use crate::error::CliError;

pub async fn run_month(
    month: Option<&str>,
    as_json: bool,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let (year, month) = match month {
        Some(raw) => parse_month(raw)?,
        None => current_month(local_today()),
    };

    let engine = open_refreshed_engine(options).await?;
    let records = engine.by_month(year, month);
    print_records(
        &records,
        as_json,
        &format!("No leave in {year}-{month:02}."),
    )
}
