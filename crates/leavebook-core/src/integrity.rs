//! Integrity checks for pulled snapshots
//!
//! Anyone can drop a hand-edited `data.json` into the shared folder, so a
//! pulled snapshot is read record by record. Well-formed records pass
//! through. The rest are reported and kept out of the store, but their raw
//! JSON travels with the issue so pushes can hand them back unchanged.

use std::fmt;

use serde_json::Value;

use serde::Deserialize;

use crate::models::{day_count, LeaveRecord, RecordId};
use crate::validation::{check_record, parse_date, MAX_LEAVE_DAYS};

/// A single problem found in a pulled record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityProblem {
    NotAnObject,
    MissingId,
    MissingSubject,
    MissingStartDate,
    MissingEndDate,
    MalformedStartDate,
    MalformedEndDate,
    InvertedRange,
    RangeTooLong(i64),
    Unreadable(String),
}

impl fmt::Display for IntegrityProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "not an object"),
            Self::MissingId => write!(f, "missing id"),
            Self::MissingSubject => write!(f, "missing name"),
            Self::MissingStartDate => write!(f, "missing start date"),
            Self::MissingEndDate => write!(f, "missing end date"),
            Self::MalformedStartDate => write!(f, "malformed start date"),
            Self::MalformedEndDate => write!(f, "malformed end date"),
            Self::InvertedRange => write!(f, "start date after end date"),
            Self::RangeTooLong(days) => write!(f, "unusually long leave ({days} days)"),
            Self::Unreadable(reason) => write!(f, "unreadable record: {reason}"),
        }
    }
}

/// A rejected record and everything wrong with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityIssue {
    /// Position in the pulled array
    pub index: usize,
    pub subject: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub problems: Vec<IntegrityProblem>,
    /// The entry as pulled
    pub raw: Value,
}

impl IntegrityIssue {
    /// Id of the rejected entry, when it carries a numeric one
    #[must_use]
    pub fn record_id(&self) -> Option<RecordId> {
        self.raw.get("id").and_then(Value::as_i64).map(RecordId::new)
    }
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let problems = self
            .problems
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "#{} {} ({} ~ {}): {}",
            self.index,
            self.subject.as_deref().unwrap_or("unknown"),
            self.start_date.as_deref().unwrap_or("?"),
            self.end_date.as_deref().unwrap_or("?"),
            problems
        )
    }
}

/// Accepted records plus the issues found in the rest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub records: Vec<LeaveRecord>,
    pub issues: Vec<IntegrityIssue>,
}

/// Split a raw snapshot into valid records and integrity issues
#[must_use]
pub fn inspect_snapshot(values: Vec<Value>) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    for (index, value) in values.into_iter().enumerate() {
        match inspect_value(&value) {
            Ok(record) => report.records.push(record),
            Err((problems, subject, start_date, end_date)) => {
                report.issues.push(IntegrityIssue {
                    index,
                    subject,
                    start_date,
                    end_date,
                    problems,
                    raw: value,
                });
            }
        }
    }

    report
}

type Rejection = (
    Vec<IntegrityProblem>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn inspect_value(value: &Value) -> Result<LeaveRecord, Rejection> {
    let Some(object) = value.as_object() else {
        return Err((vec![IntegrityProblem::NotAnObject], None, None, None));
    };

    let text_field = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToString::to_string)
    };
    let subject = text_field("name");
    let start_date = text_field("startDate");
    let end_date = text_field("endDate");

    let mut problems = Vec::new();
    if !object.get("id").is_some_and(Value::is_i64) {
        problems.push(IntegrityProblem::MissingId);
    }
    if subject.is_none() {
        problems.push(IntegrityProblem::MissingSubject);
    }

    let start = match start_date.as_deref() {
        None => {
            problems.push(IntegrityProblem::MissingStartDate);
            None
        }
        Some(raw) => parse_date(raw)
            .map_err(|_| problems.push(IntegrityProblem::MalformedStartDate))
            .ok(),
    };
    let end = match end_date.as_deref() {
        None => {
            problems.push(IntegrityProblem::MissingEndDate);
            None
        }
        Some(raw) => parse_date(raw)
            .map_err(|_| problems.push(IntegrityProblem::MalformedEndDate))
            .ok(),
    };

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            problems.push(IntegrityProblem::InvertedRange);
        } else {
            let days = day_count(start, end);
            if days > MAX_LEAVE_DAYS {
                problems.push(IntegrityProblem::RangeTooLong(days));
            }
        }
    }

    if problems.is_empty() {
        match LeaveRecord::deserialize(value) {
            Ok(record) => match check_record(&record) {
                Ok(()) => return Ok(record),
                Err(error) => problems.push(IntegrityProblem::Unreadable(error.to_string())),
            },
            Err(error) => problems.push(IntegrityProblem::Unreadable(error.to_string())),
        }
    }

    Err((problems, subject, start_date, end_date))
}
