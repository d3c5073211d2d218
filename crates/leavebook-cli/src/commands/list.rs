use crate::cli::GlobalOptions;
use crate::commands::common::{open_refreshed_engine, print_records};
use crate::error::CliError;

pub async fn run_list(
    name: Option<&str>,
    as_json: bool,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let engine = open_refreshed_engine(options).await?;
    let mut records = engine.records();
    if let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) {
        records.retain(|record| record.subject == name);
    }

    print_records(&records, as_json, "No leave recorded.")
}
