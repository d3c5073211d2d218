//! Leave record model

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A unique identifier for a leave record, derived from its creation time
/// in Unix milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Create an identifier from the current wall clock
    #[must_use]
    pub fn from_now() -> Self {
        Self(crate::util::unix_timestamp_millis_now())
    }

    /// Raw integer value
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// The identifier immediately after this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Kind of absence. Only plain leave exists today; unknown tags written by
/// newer clients are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeaveKind {
    #[default]
    Leave,
    Other(String),
}

impl LeaveKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Leave => "leave",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for LeaveKind {
    fn from(value: String) -> Self {
        if value == "leave" {
            Self::Leave
        } else {
            Self::Other(value)
        }
    }
}

impl From<LeaveKind> for String {
    fn from(value: LeaveKind) -> Self {
        match value {
            LeaveKind::Leave => "leave".to_string(),
            LeaveKind::Other(tag) => tag,
        }
    }
}

/// A single leave interval for one person.
///
/// Serialized with the field names the shared `data.json` file uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRecord {
    /// Unique identifier
    pub id: RecordId,
    /// Who is on leave
    #[serde(rename = "name")]
    pub subject: String,
    /// Kind of absence
    #[serde(rename = "type", default)]
    pub kind: LeaveKind,
    /// First day of leave (inclusive)
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    /// Last day of leave (inclusive)
    #[serde(rename = "endDate")]
    pub end_date: NaiveDate,
    /// Day the request was submitted
    #[serde(rename = "submitDate")]
    pub submitted_on: NaiveDate,
}

impl LeaveRecord {
    /// Create a plain leave record
    #[must_use]
    pub fn new(
        id: RecordId,
        subject: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        submitted_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            subject: subject.into(),
            kind: LeaveKind::Leave,
            start_date,
            end_date,
            submitted_on,
        }
    }

    /// Number of days covered, counting both endpoints
    #[must_use]
    pub fn day_count(&self) -> i64 {
        day_count(self.start_date, self.end_date)
    }

    /// Whether `date` falls within the leave period
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Whether the leave period overlaps `[start, end]` inclusively
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        ranges_overlap(self.start_date, self.end_date, start, end)
    }
}

/// Inclusive day count of `[start, end]`.
///
/// Returns 1 for a single-day leave.
#[must_use]
pub fn day_count(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Inclusive interval overlap test.
#[must_use]
pub fn ranges_overlap(
    start1: NaiveDate,
    end1: NaiveDate,
    start2: NaiveDate,
    end2: NaiveDate,
) -> bool {
    start1 <= end2 && start2 <= end1
}
