use std::env;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use leavebook_core::config::ClientConfig;
use leavebook_core::db::LibSqlSlots;
use leavebook_core::export::ManualExport;
use leavebook_core::remote::AnyRemote;
use leavebook_core::sync::{PushOutcome, SyncEngine, SyncEvent, TickOutcome};
use leavebook_core::{LeaveRecord, RecordId};
use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::error::CliError;

pub type Engine = SyncEngine<AnyRemote, LibSqlSlots>;

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: i64,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub days: i64,
    pub submitted_on: String,
}

pub fn record_to_list_item(record: &LeaveRecord) -> RecordListItem {
    RecordListItem {
        id: record.id.value(),
        name: record.subject.clone(),
        start_date: record.start_date.to_string(),
        end_date: record.end_date.to_string(),
        days: record.day_count(),
        submitted_on: record.submitted_on.to_string(),
    }
}

pub fn format_record_line(record: &LeaveRecord) -> String {
    format!(
        "{}  {}  {} ~ {}  {} day{}  (submitted {})",
        record.id,
        record.subject,
        record.start_date,
        record.end_date,
        record.day_count(),
        if record.day_count() == 1 { "" } else { "s" },
        record.submitted_on
    )
}

/// Lines ordered by start date, then name
pub fn format_record_lines(records: &[LeaveRecord]) -> Vec<String> {
    sorted_records(records)
        .iter()
        .map(format_record_line)
        .collect()
}

pub fn sorted_records(records: &[LeaveRecord]) -> Vec<LeaveRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|left, right| {
        left.start_date
            .cmp(&right.start_date)
            .then_with(|| left.subject.cmp(&right.subject))
            .then_with(|| left.id.cmp(&right.id))
    });
    sorted
}

pub fn print_records(
    records: &[LeaveRecord],
    as_json: bool,
    empty_message: &str,
) -> Result<(), CliError> {
    if as_json {
        let json_items = sorted_records(records)
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{empty_message}");
        return Ok(());
    }

    for line in format_record_lines(records) {
        println!("{line}");
    }
    Ok(())
}

pub fn parse_record_id(raw: &str) -> Result<RecordId, CliError> {
    raw.parse::<RecordId>()
        .map_err(|_| CliError::InvalidRecordId(raw.trim().to_string()))
}

/// Parse `YYYY-MM`
pub fn parse_month(raw: &str) -> Result<(i32, u32), CliError> {
    let invalid = || CliError::InvalidMonth(raw.trim().to_string());
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month.parse::<u32>().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

pub fn current_month(today: NaiveDate) -> (i32, u32) {
    (today.year(), today.month())
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    Ok(dirs::config_dir()
        .ok_or(CliError::MissingDirectory("config"))?
        .join("leavebook")
        .join("config.json"))
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    Ok(data_dir()?.join("leavebook.db"))
}

pub fn default_export_dir() -> Result<PathBuf, CliError> {
    Ok(data_dir()?.join("export"))
}

fn data_dir() -> Result<PathBuf, CliError> {
    Ok(dirs::data_dir()
        .ok_or(CliError::MissingDirectory("data"))?
        .join("leavebook"))
}

/// File config, then environment, then command-line flags
pub fn resolve_config(
    options: &GlobalOptions,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig, CliError> {
    let config_path = match &options.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    let mut config = ClientConfig::load_or_default(&config_path)?.with_env_overrides(lookup);
    if let Some(url) = &options.remote_url {
        config.remote_url = Some(url.clone());
    }
    if let Some(path) = &options.db_path {
        config.db_path = Some(path.clone());
    }
    if options.offline {
        config.remote_url = None;
    }
    if config.db_path.is_none() {
        config.db_path = Some(default_db_path()?);
    }

    Ok(config.normalize()?)
}

/// Open the engine and restore the local copy
pub async fn open_engine(options: &GlobalOptions) -> Result<Engine, CliError> {
    let config = resolve_config(options, |key| env::var(key).ok())?;
    let db_path = match &config.db_path {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };

    let slots = LibSqlSlots::open(&db_path).await?;
    let engine = SyncEngine::new(config.build_remote()?, slots, config.sync_settings());
    if let Err(error) = engine.load_local().await {
        tracing::warn!("Ignoring unreadable local copy at {}: {error}", db_path.display());
    }
    Ok(engine)
}

/// Open the engine and pull once so commands see current data
pub async fn open_refreshed_engine(options: &GlobalOptions) -> Result<Engine, CliError> {
    let engine = open_engine(options).await?;
    if engine.remote().is_configured() {
        let outcome = engine.tick().await;
        if let TickOutcome::PullFailed { reason } = &outcome {
            eprintln!(
                "Warning: showing the local copy, the shared store is unreachable ({reason})"
            );
        }
    }
    Ok(engine)
}

pub fn format_event(event: &SyncEvent) -> String {
    match event {
        SyncEvent::StatusChanged { phase, state } => format!("status: {state} ({phase})"),
        SyncEvent::RecordsChanged { count } => format!("records: {count}"),
        SyncEvent::Degraded(notice) => format!("warning: {notice}"),
        SyncEvent::IntegrityIssues(issues) => {
            let mut lines = vec![format!("skipped {} malformed records:", issues.len())];
            lines.extend(issues.iter().map(|issue| format!("  {issue}")));
            lines.join("\n")
        }
    }
}

pub fn write_manual_export(export: &ManualExport, dir: &Path) -> Result<PathBuf, CliError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&export.file_name);
    std::fs::write(&path, &export.contents)?;
    Ok(path)
}

/// Tell the operator where a failed push left their change
pub fn report_push(push: &PushOutcome) -> Result<(), CliError> {
    let PushOutcome::Failed { reason, export } = push else {
        return Ok(());
    };

    eprintln!("Warning: saved locally only ({reason})");
    if let Some(export) = export {
        let path = write_manual_export(export, &default_export_dir()?)?;
        eprintln!("Manual export written to {}", path.display());
        eprintln!("{}", export.instructions);
    }
    Ok(())
}
