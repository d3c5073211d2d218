//! Record export helpers, including the manual fallback used when a push fails.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::LeaveRecord;

/// File name the shared store reads records from
pub const MANUAL_EXPORT_FILE_NAME: &str = "data.json";

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Render records as pretty-printed JSON in the shared wire format.
pub fn render_json_export(records: &[LeaveRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Render records as a Markdown table, ordered by start date.
#[must_use]
pub fn render_markdown_export(records: &[LeaveRecord]) -> String {
    let mut sorted = records.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|record| (record.start_date, record.subject.clone(), record.id));

    let mut output = String::new();
    let _ = writeln!(output, "# Leave records");
    let _ = writeln!(output);
    let _ = writeln!(output, "| Name | Start | End | Days | Submitted | Id |");
    let _ = writeln!(output, "| --- | --- | --- | --- | --- | --- |");
    for record in sorted {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} |",
            record.subject,
            record.start_date,
            record.end_date,
            record.day_count(),
            record.submitted_on,
            record.id
        );
    }

    output
}

/// Render records based on selected export format.
pub fn render_records_export(
    records: &[LeaveRecord],
    format: ExportFormat,
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(records),
        ExportFormat::Markdown => Ok(render_markdown_export(records)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("leavebook-export-{timestamp_ms}.{}", format.extension())
}

/// A replacement `data.json` for the operator to place in the shared folder
/// by hand after the remote rejected or missed a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualExport {
    pub file_name: String,
    pub contents: String,
    pub instructions: String,
    pub record_count: usize,
}

/// The array written to the shared store: `records` in order, followed by
/// pulled entries this client could not read.
pub fn shared_payload(
    records: &[LeaveRecord],
    preserved: &[Value],
) -> serde_json::Result<Vec<Value>> {
    let mut payload = records
        .iter()
        .map(serde_json::to_value)
        .collect::<serde_json::Result<Vec<_>>>()?;
    payload.extend_from_slice(preserved);
    Ok(payload)
}

/// Build the manual export for the full record set, keeping unreadable
/// entries so placing the file does not erase them.
pub fn manual_export(
    records: &[LeaveRecord],
    preserved: &[Value],
) -> serde_json::Result<ManualExport> {
    let payload = shared_payload(records, preserved)?;
    Ok(ManualExport {
        file_name: MANUAL_EXPORT_FILE_NAME.to_string(),
        contents: serde_json::to_string_pretty(&payload)?,
        instructions: sync_instructions(payload.len()),
        record_count: payload.len(),
    })
}

/// Steps for placing a manual export so other clients pick it up.
#[must_use]
pub fn sync_instructions(record_count: usize) -> String {
    format!(
        "The shared store could not be updated, so your change is only saved on this machine.\n\
         To share it:\n\
         1. Take the exported {MANUAL_EXPORT_FILE_NAME} ({record_count} records).\n\
         2. Copy it into the shared leave folder, replacing the existing {MANUAL_EXPORT_FILE_NAME}.\n\
         3. Other clients pick it up on their next refresh."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordId;
    use chrono::NaiveDate;

    fn record(id: i64, subject: &str, start: (u32, u32), end: (u32, u32)) -> LeaveRecord {
        LeaveRecord::new(
            RecordId::new(id),
            subject,
            NaiveDate::from_ymd_opt(2025, start.0, start.1).unwrap(),
            NaiveDate::from_ymd_opt(2025, end.0, end.1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        )
    }

    #[test]
    fn render_markdown_export_orders_by_start_date() {
        let records = vec![
            record(2, "Wang", (8, 5), (8, 6)),
            record(1, "Tang", (7, 22), (7, 24)),
        ];

        let rendered = render_markdown_export(&records);
        let tang = rendered.find("| Tang |").unwrap();
        let wang = rendered.find("| Wang |").unwrap();
        assert!(tang < wang);
        assert!(rendered.contains("| Tang | 2025-07-22 | 2025-07-24 | 3 | 2025-07-01 | 1 |"));
    }

    #[test]
    fn manual_export_uses_shared_file_name_and_wire_format() {
        let export = manual_export(&[record(7, "Lin", (7, 31), (8, 1))], &[]).unwrap();

        assert_eq!(export.file_name, "data.json");
        assert_eq!(export.record_count, 1);
        assert!(export.contents.contains("\"startDate\": \"2025-07-31\""));
        assert!(export.instructions.contains("1 records"));
    }

    #[test]
    fn manual_export_keeps_unreadable_entries_after_records() {
        let stray = serde_json::json!({"id": 2, "name": "Wang", "startDate": "2025-01-01"});
        let export = manual_export(&[record(7, "Lin", (7, 31), (8, 1))], &[stray.clone()]).unwrap();

        let written: Vec<Value> = serde_json::from_str(&export.contents).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0]["id"], 7);
        assert_eq!(written[1], stray);
        assert_eq!(export.record_count, 2);
    }

    #[test]
    fn suggested_export_file_name_uses_format_extension() {
        assert_eq!(
            suggested_export_file_name(ExportFormat::Json, 123),
            "leavebook-export-123.json"
        );
        assert_eq!(
            suggested_export_file_name(ExportFormat::Markdown, 456),
            "leavebook-export-456.md"
        );
    }
}
