use leavebook_core::sync::{SubmitOutcome, SubmitPolicy};
use leavebook_core::LeaveRequest;

use crate::cli::GlobalOptions;
use crate::commands::common::{open_refreshed_engine, report_push};
use crate::error::CliError;

pub async fn run_submit(
    name: &str,
    start: &str,
    end: &str,
    allow_overlap: bool,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let request = LeaveRequest::parse(name, start, end)?;
    let policy = if allow_overlap {
        SubmitPolicy::AllowConflicts
    } else {
        SubmitPolicy::RejectConflicts
    };

    let engine = open_refreshed_engine(options).await?;
    match engine.submit(request, policy).await? {
        SubmitOutcome::Added { record, push } => {
            println!("{}", record.id);
            report_push(&push)
        }
        SubmitOutcome::Blocked { message, .. } => Err(CliError::Blocked(message)),
    }
}
