//! Validation for leave submissions and stored records

use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;
use thiserror::Error;

use crate::models::{day_count, LeaveRecord, RecordId};

/// Longest accepted name, in characters
pub const MAX_SUBJECT_CHARS: usize = 50;

/// Longest accepted leave, in inclusive days
pub const MAX_LEAVE_DAYS: i64 = 365;

/// Earliest accepted start, relative to today
const MAX_MONTHS_IN_PAST: u32 = 12;

/// Latest accepted start, relative to today
const MAX_MONTHS_IN_FUTURE: u32 = 24;

/// Latin letters, CJK unified ideographs and whitespace
static SUBJECT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{Han}a-zA-Z\s]+$").expect("Invalid regex"));

static MARKUP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Invalid regex"));

/// Reasons a leave request or record is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required")]
    EmptySubject,
    #[error("Name is {0} characters long; the maximum is {MAX_SUBJECT_CHARS}")]
    SubjectTooLong(usize),
    #[error("Name may only contain letters and spaces: {0:?}")]
    InvalidSubjectCharacters(String),
    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    #[error("Leave spans {0} days; the maximum is {MAX_LEAVE_DAYS}")]
    RangeTooLong(i64),
    #[error("Start date {0} is more than one year in the past")]
    TooFarInPast(NaiveDate),
    #[error("Start date {0} is more than two years in the future")]
    TooFarInFuture(NaiveDate),
    #[error("Record id {0} already exists")]
    DuplicateId(RecordId),
}

/// A validated request to record a new leave period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    subject: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl LeaveRequest {
    /// Build a request from already-parsed dates.
    ///
    /// The subject is checked against the accepted character set and then
    /// sanitized; the date range is checked for shape only. Policy bounds
    /// relative to today are applied by [`LeaveRequest::validate`].
    pub fn new(
        subject: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let subject = validate_subject(subject)?;
        validate_range(start_date, end_date)?;
        Ok(Self {
            subject,
            start_date,
            end_date,
        })
    }

    /// Build a request from raw form input
    pub fn parse(subject: &str, start_date: &str, end_date: &str) -> Result<Self, ValidationError> {
        Self::new(subject, parse_date(start_date)?, parse_date(end_date)?)
    }

    /// Apply the submission window relative to `today`
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        validate_range(self.start_date, self.end_date)?;
        validate_window(self.start_date, today)
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    #[must_use]
    pub fn day_count(&self) -> i64 {
        day_count(self.start_date, self.end_date)
    }

    /// Turn the request into a record submitted on `submitted_on`
    #[must_use]
    pub fn into_record(self, id: RecordId, submitted_on: NaiveDate) -> LeaveRecord {
        LeaveRecord::new(
            id,
            self.subject,
            self.start_date,
            self.end_date,
            submitted_on,
        )
    }
}

/// Strip markup and unsafe characters, limit the length, and trim.
#[must_use]
pub fn sanitize_subject(input: &str) -> String {
    let without_markup = MARKUP_PATTERN.replace_all(input.trim(), "");
    let cleaned = without_markup
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '&' | '"' | '\''))
        .take(MAX_SUBJECT_CHARS)
        .collect::<String>();
    cleaned.trim().to_string()
}

/// Check a raw name and return its sanitized form
pub fn validate_subject(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptySubject);
    }

    let length = trimmed.chars().count();
    if length > MAX_SUBJECT_CHARS {
        return Err(ValidationError::SubjectTooLong(length));
    }

    if !SUBJECT_PATTERN.is_match(trimmed) {
        return Err(ValidationError::InvalidSubjectCharacters(
            trimmed.to_string(),
        ));
    }

    let sanitized = sanitize_subject(trimmed);
    if sanitized.is_empty() {
        Err(ValidationError::EmptySubject)
    } else {
        Ok(sanitized)
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if !DATE_PATTERN.is_match(raw) {
        return Err(ValidationError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Intrinsic range rules: ordered, and at most [`MAX_LEAVE_DAYS`] inclusive days
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::InvertedRange { start, end });
    }

    let days = day_count(start, end);
    if days > MAX_LEAVE_DAYS {
        return Err(ValidationError::RangeTooLong(days));
    }

    Ok(())
}

/// Submission window: no earlier than a year ago, no later than two years ahead
pub fn validate_window(start: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if let Some(earliest) = today.checked_sub_months(Months::new(MAX_MONTHS_IN_PAST)) {
        if start < earliest {
            return Err(ValidationError::TooFarInPast(start));
        }
    }

    if let Some(latest) = today.checked_add_months(Months::new(MAX_MONTHS_IN_FUTURE)) {
        if start > latest {
            return Err(ValidationError::TooFarInFuture(start));
        }
    }

    Ok(())
}

/// Invariants every record in the store must satisfy
pub fn check_record(record: &LeaveRecord) -> Result<(), ValidationError> {
    if sanitize_subject(&record.subject).is_empty() {
        return Err(ValidationError::EmptySubject);
    }
    validate_range(record.start_date, record.end_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn test_validate_subject_accepts_latin_and_cjk() {
        assert_eq!(validate_subject("  Tang Wei ").unwrap(), "Tang Wei");
        assert_eq!(validate_subject("張小明").unwrap(), "張小明");
    }

    #[test]
    fn test_validate_subject_rejects_empty_and_long() {
        assert_eq!(validate_subject("   "), Err(ValidationError::EmptySubject));
        let long = "a".repeat(51);
        assert_eq!(
            validate_subject(&long),
            Err(ValidationError::SubjectTooLong(51))
        );
        assert!(validate_subject(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_validate_subject_rejects_markup_and_digits() {
        assert!(matches!(
            validate_subject("<b>Tang</b>"),
            Err(ValidationError::InvalidSubjectCharacters(_))
        ));
        assert!(matches!(
            validate_subject("Agent 007"),
            Err(ValidationError::InvalidSubjectCharacters(_))
        ));
    }

    #[test]
    fn test_sanitize_subject_strips_markup() {
        assert_eq!(sanitize_subject(" <script>x</script>Tang "), "xTang");
        assert_eq!(sanitize_subject("O'Brien & Co"), "OBrien  Co");
        assert_eq!(sanitize_subject(&"b".repeat(80)).chars().count(), 50);
    }

    #[test]
    fn test_parse_date_requires_iso_shape() {
        assert_eq!(parse_date("2025-08-10").unwrap(), date("2025-08-10"));
        assert!(parse_date("2025-8-10").is_err());
        assert!(parse_date("2025-02-30").is_err());
        assert!(parse_date("10/08/2025").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(date("2025-08-10"), date("2025-08-10")).is_ok());
        assert_eq!(
            validate_range(date("2025-08-12"), date("2025-08-10")),
            Err(ValidationError::InvertedRange {
                start: date("2025-08-12"),
                end: date("2025-08-10"),
            })
        );
        assert!(validate_range(date("2025-01-01"), date("2025-12-31")).is_ok());
        assert_eq!(
            validate_range(date("2025-01-01"), date("2026-01-01")),
            Err(ValidationError::RangeTooLong(366))
        );
    }

    #[test]
    fn test_validate_window() {
        let today = date("2025-08-01");
        assert!(validate_window(date("2024-08-01"), today).is_ok());
        assert_eq!(
            validate_window(date("2024-07-31"), today),
            Err(ValidationError::TooFarInPast(date("2024-07-31")))
        );
        assert!(validate_window(date("2027-08-01"), today).is_ok());
        assert_eq!(
            validate_window(date("2027-08-02"), today),
            Err(ValidationError::TooFarInFuture(date("2027-08-02")))
        );
    }

    #[test]
    fn test_request_parse_and_into_record() {
        let request = LeaveRequest::parse(" Tang ", "2025-08-10", "2025-08-14").unwrap();
        assert_eq!(request.subject(), "Tang");
        assert_eq!(request.day_count(), 5);
        assert!(request.validate(date("2025-08-01")).is_ok());

        let record = request.into_record(RecordId::new(9), date("2025-08-01"));
        assert_eq!(record.subject, "Tang");
        assert_eq!(record.submitted_on, date("2025-08-01"));
    }

    #[test]
    fn test_request_rejects_inverted_range() {
        assert!(matches!(
            LeaveRequest::parse("Tang", "2025-08-14", "2025-08-10"),
            Err(ValidationError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_check_record() {
        let valid = LeaveRecord::new(
            RecordId::new(1),
            "Tang",
            date("2025-08-10"),
            date("2025-08-14"),
            date("2025-08-01"),
        );
        assert!(check_record(&valid).is_ok());

        let blank = LeaveRecord {
            subject: " <i></i> ".to_string(),
            ..valid.clone()
        };
        assert_eq!(check_record(&blank), Err(ValidationError::EmptySubject));
    }
}
