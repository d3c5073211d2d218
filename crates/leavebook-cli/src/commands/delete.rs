use crate::cli::GlobalOptions;
use crate::commands::common::{open_refreshed_engine, parse_record_id, report_push};
use crate::error::CliError;

pub async fn run_delete(id: &str, options: &GlobalOptions) -> Result<(), CliError> {
    let id = parse_record_id(id)?;
    let engine = open_refreshed_engine(options).await?;
    let outcome = engine.delete(id).await;

    match &outcome.removed {
        Some(record) => println!("{}", record.id),
        None => eprintln!("No record {id} here; it will stay hidden if it shows up later."),
    }
    if !outcome.tombstone_persisted {
        eprintln!("Warning: the deletion is not shared yet and may be undone by other clients.");
    }
    report_push(&outcome.push)
}
