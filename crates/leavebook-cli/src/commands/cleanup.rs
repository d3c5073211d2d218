use crate::cli::GlobalOptions;
use crate::commands::common::{format_record_line, open_refreshed_engine, report_push};
use crate::error::CliError;

pub async fn run_cleanup(dry_run: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let engine = open_refreshed_engine(options).await?;

    if dry_run {
        let groups = engine.duplicate_groups();
        if groups.is_empty() {
            println!("No duplicate records.");
        }
        for group in groups {
            println!("keep    {}", format_record_line(&group.canonical));
            for record in &group.extraneous {
                println!("remove  {}", format_record_line(record));
            }
        }
        return Ok(());
    }

    let report = engine.cleanup_duplicates().await;
    println!(
        "{} records before, {} duplicates removed, {} after",
        report.before,
        report.removed.len(),
        report.after
    );
    if let Some(push) = &report.push {
        report_push(push)?;
    }
    Ok(())
}
