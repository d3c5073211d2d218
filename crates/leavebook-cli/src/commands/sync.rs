use leavebook_core::sync::TickOutcome;

use crate::cli::GlobalOptions;
use crate::commands::common::{open_engine, report_push};
use crate::error::CliError;

pub fn describe_tick(outcome: &TickOutcome) -> String {
    match outcome {
        TickOutcome::Skipped => "Another sync is already running".to_string(),
        TickOutcome::PullFailed { reason } => format!("Could not reach the shared store: {reason}"),
        TickOutcome::Unchanged => "Already up to date".to_string(),
        TickOutcome::Stale => "Local changes arrived during the pull; try again".to_string(),
        TickOutcome::Reconciled(report) => {
            let mut summary = format!("Synced {} records", report.record_count);
            if !report.duplicates_removed.is_empty() {
                summary.push_str(&format!(
                    ", removed {} duplicates",
                    report.duplicates_removed.len()
                ));
            }
            if report.tombstoned > 0 {
                summary.push_str(&format!(", hid {} deleted", report.tombstoned));
            }
            if !report.integrity_issues.is_empty() {
                summary.push_str(&format!(
                    ", skipped {} malformed",
                    report.integrity_issues.len()
                ));
            }
            summary
        }
    }
}

pub async fn run_sync(push: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let engine = open_engine(options).await?;
    let outcome = engine.tick().await;
    println!("{}", describe_tick(&outcome));

    if let TickOutcome::Reconciled(report) = &outcome {
        for issue in &report.integrity_issues {
            eprintln!("  {issue}");
        }
        if let Some(push) = &report.push {
            report_push(push)?;
        }
    }

    if push {
        report_push(&engine.push_now().await)?;
    }
    Ok(())
}
