//! Overlap detection for same-person leave periods

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::models::{day_count, Conflict, LeaveRecord, RecordId};
use crate::store::RecordStore;

/// Finds existing records that overlap a requested period for the same person
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector<'a> {
    store: &'a RecordStore,
}

impl<'a> ConflictDetector<'a> {
    pub const fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Every record for `subject` overlapping `[start, end]` inclusively,
    /// skipping `exclude` when re-checking an existing record against its peers
    #[must_use]
    pub fn conflicts(
        &self,
        subject: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<RecordId>,
    ) -> Vec<Conflict> {
        find_conflicts(self.store.all(), subject, start, end, exclude)
    }
}

/// Slice form of [`ConflictDetector::conflicts`]
#[must_use]
pub fn find_conflicts(
    records: &[LeaveRecord],
    subject: &str,
    start: NaiveDate,
    end: NaiveDate,
    exclude: Option<RecordId>,
) -> Vec<Conflict> {
    records
        .iter()
        .filter(|record| Some(record.id) != exclude)
        .filter(|record| record.subject == subject)
        .filter(|record| record.overlaps(start, end))
        .map(Conflict::from)
        .collect()
}

/// Operator-facing explanation of why a submission was blocked
#[must_use]
pub fn format_conflict_message(
    subject: &str,
    start: NaiveDate,
    end: NaiveDate,
    conflicts: &[Conflict],
) -> String {
    let mut message = String::new();
    let _ = writeln!(message, "Leave period conflict for {subject}");
    let _ = writeln!(
        message,
        "Requested: {start} - {end} ({} days)",
        day_count(start, end)
    );
    let _ = writeln!(message, "Overlapping records:");
    for (index, conflict) in conflicts.iter().enumerate() {
        let _ = writeln!(
            message,
            "  {}. {} - {} ({} days), submitted {} [id {}]",
            index + 1,
            conflict.start_date,
            conflict.end_date,
            conflict.days,
            conflict.submitted_on,
            conflict.id
        );
    }
    let _ = write!(
        message,
        "The request was not recorded. Adjust the dates or delete the conflicting record first."
    );
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    fn record(id: i64, subject: &str, start: &str, end: &str) -> LeaveRecord {
        LeaveRecord::new(
            RecordId::new(id),
            subject,
            date(start),
            date(end),
            date("2025-08-01"),
        )
    }

    fn store_with(records: Vec<LeaveRecord>) -> RecordStore {
        let mut store = RecordStore::new();
        for record in records {
            store.add(record).unwrap();
        }
        store
    }

    #[test]
    fn test_tang_overlap_example() {
        let store = store_with(vec![record(1, "Tang", "2025-08-10", "2025-08-14")]);
        let detector = ConflictDetector::new(&store);

        let overlapping = detector.conflicts("Tang", date("2025-08-12"), date("2025-08-16"), None);
        assert_eq!(overlapping.len(), 1);
        assert_eq!(overlapping[0].id, RecordId::new(1));
        assert_eq!(overlapping[0].days, 5);

        let clear = detector.conflicts("Tang", date("2025-08-20"), date("2025-08-22"), None);
        assert!(clear.is_empty());
    }

    #[test]
    fn test_other_subjects_never_conflict() {
        let store = store_with(vec![record(1, "Tang", "2025-08-10", "2025-08-14")]);
        let detector = ConflictDetector::new(&store);
        assert!(detector
            .conflicts("Newcomer", date("2025-08-10"), date("2025-08-12"), None)
            .is_empty());
    }

    #[test]
    fn test_conflicts_are_symmetric() {
        let existing = record(1, "Tang", "2025-08-10", "2025-08-14");
        let candidate = record(2, "Tang", "2025-08-14", "2025-08-20");

        let forward = find_conflicts(
            std::slice::from_ref(&existing),
            "Tang",
            candidate.start_date,
            candidate.end_date,
            None,
        );
        let backward = find_conflicts(
            std::slice::from_ref(&candidate),
            "Tang",
            existing.start_date,
            existing.end_date,
            None,
        );
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
    }

    #[test]
    fn test_exclude_removes_exactly_one_record() {
        let store = store_with(vec![
            record(1, "Tang", "2025-08-10", "2025-08-14"),
            record(2, "Tang", "2025-08-13", "2025-08-15"),
            record(3, "Tang", "2025-09-01", "2025-09-02"),
        ]);
        let detector = ConflictDetector::new(&store);

        let all = detector.conflicts("Tang", date("2025-08-10"), date("2025-08-14"), None);
        let ids = all.iter().map(|conflict| conflict.id.value()).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2]);

        let excluded = detector.conflicts(
            "Tang",
            date("2025-08-10"),
            date("2025-08-14"),
            Some(RecordId::new(1)),
        );
        let ids = excluded
            .iter()
            .map(|conflict| conflict.id.value())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_format_conflict_message_lists_each_conflict() {
        let existing = record(1, "Tang", "2025-08-10", "2025-08-14");
        let conflicts = vec![Conflict::from(&existing)];

        let message =
            format_conflict_message("Tang", date("2025-08-12"), date("2025-08-16"), &conflicts);
        assert!(message.contains("Tang"));
        assert!(message.contains("2025-08-12 - 2025-08-16 (5 days)"));
        assert!(message.contains("1. 2025-08-10 - 2025-08-14 (5 days), submitted 2025-08-01"));
    }
}
