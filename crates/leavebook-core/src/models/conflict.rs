//! Conflict model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{LeaveRecord, RecordId};

/// An existing record whose period overlaps a requested one for the same person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Conflicting record
    pub id: RecordId,
    pub subject: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub submitted_on: NaiveDate,
    /// Inclusive day count of the conflicting record
    pub days: i64,
}

impl From<&LeaveRecord> for Conflict {
    fn from(record: &LeaveRecord) -> Self {
        Self {
            id: record.id,
            subject: record.subject.clone(),
            start_date: record.start_date,
            end_date: record.end_date,
            submitted_on: record.submitted_on,
            days: record.day_count(),
        }
    }
}
