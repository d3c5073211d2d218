use leavebook_core::conflict::format_conflict_message;
use leavebook_core::LeaveRequest;

use crate::cli::GlobalOptions;
use crate::commands::common::{open_refreshed_engine, parse_record_id};
use crate::error::CliError;

pub async fn run_check(
    name: &str,
    start: &str,
    end: &str,
    exclude: Option<&str>,
    as_json: bool,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let request = LeaveRequest::parse(name, start, end)?;
    let exclude = exclude.map(parse_record_id).transpose()?;

    let engine = open_refreshed_engine(options).await?;
    let conflicts = engine.conflicts(
        request.subject(),
        request.start_date(),
        request.end_date(),
        exclude,
    );

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
    } else if conflicts.is_empty() {
        println!(
            "No overlapping leave for {} ({} - {}, {} days).",
            request.subject(),
            request.start_date(),
            request.end_date(),
            request.day_count()
        );
    } else {
        println!(
            "{}",
            format_conflict_message(
                request.subject(),
                request.start_date(),
                request.end_date(),
                &conflicts
            )
        );
    }

    Ok(())
}
