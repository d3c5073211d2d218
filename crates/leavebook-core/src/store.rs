//! In-memory record store

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;

use crate::models::{LeaveRecord, RecordId};
use crate::validation::{check_record, ValidationError};

/// The client's authoritative set of leave records, in insertion order.
///
/// Callers are responsible for serializing access; the store itself does no
/// locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<LeaveRecord>,
    ids: HashSet<RecordId>,
}

impl RecordStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in insertion order
    #[must_use]
    pub fn all(&self) -> &[LeaveRecord] {
        &self.records
    }

    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&LeaveRecord> {
        if !self.ids.contains(&id) {
            return None;
        }
        self.records.iter().find(|record| record.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record after checking the store invariants
    pub fn add(&mut self, record: LeaveRecord) -> Result<(), ValidationError> {
        check_record(&record)?;
        if self.ids.contains(&record.id) {
            return Err(ValidationError::DuplicateId(record.id));
        }
        self.ids.insert(record.id);
        self.records.push(record);
        Ok(())
    }

    /// Remove a record, returning it if it was present
    pub fn remove(&mut self, id: RecordId) -> Option<LeaveRecord> {
        if !self.ids.remove(&id) {
            return None;
        }
        let index = self.records.iter().position(|record| record.id == id)?;
        Some(self.records.remove(index))
    }

    /// Replace the whole contents.
    ///
    /// When an id repeats, the first occurrence wins; the dropped repeats are
    /// returned.
    pub fn replace_all(&mut self, records: Vec<LeaveRecord>) -> Vec<LeaveRecord> {
        let mut ids = HashSet::with_capacity(records.len());
        let mut kept = Vec::with_capacity(records.len());
        let mut dropped = Vec::new();

        for record in records {
            if ids.insert(record.id) {
                kept.push(record);
            } else {
                dropped.push(record);
            }
        }

        self.records = kept;
        self.ids = ids;
        dropped
    }

    /// Records whose period includes `date`
    #[must_use]
    pub fn by_date(&self, date: NaiveDate) -> Vec<&LeaveRecord> {
        self.records
            .iter()
            .filter(|record| record.covers(date))
            .collect()
    }

    /// Records whose period intersects the given month (1-12).
    ///
    /// An out-of-range month yields nothing.
    #[must_use]
    pub fn by_month(&self, year: i32, month: u32) -> Vec<&LeaveRecord> {
        let Some((first, last)) = month_bounds(year, month) else {
            return Vec::new();
        };
        self.records
            .iter()
            .filter(|record| record.overlaps(first, last))
            .collect()
    }

    /// Distinct names, sorted
    #[must_use]
    pub fn subjects(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|record| record.subject.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// First and last day of a month
#[must_use]
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_first.pred_opt()?))
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
            date("2025-07-01"),
        )
    }

    fn ids(records: &[&LeaveRecord]) -> Vec<i64> {
        records.iter().map(|record| record.id.value()).collect()
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut store = RecordStore::new();
        store.add(record(3, "Chen", "2025-08-05", "2025-08-07")).unwrap();
        store.add(record(1, "Zhang", "2025-07-28", "2025-07-30")).unwrap();
        store.add(record(2, "Li", "2025-07-15", "2025-07-17")).unwrap();

        let order = store
            .all()
            .iter()
            .map(|record| record.id.value())
            .collect::<Vec<_>>();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_add_rejects_duplicate_id_and_invalid_range() {
        let mut store = RecordStore::new();
        store.add(record(1, "Zhang", "2025-07-28", "2025-07-30")).unwrap();

        assert_eq!(
            store.add(record(1, "Li", "2025-07-15", "2025-07-17")),
            Err(ValidationError::DuplicateId(RecordId::new(1)))
        );
        assert!(matches!(
            store.add(record(2, "Li", "2025-07-17", "2025-07-15")),
            Err(ValidationError::InvertedRange { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut store = RecordStore::new();
        store.add(record(1, "Zhang", "2025-07-28", "2025-07-30")).unwrap();

        assert_eq!(store.remove(RecordId::new(99)), None);
        let removed = store.remove(RecordId::new(1)).unwrap();
        assert_eq!(removed.subject, "Zhang");
        assert!(store.is_empty());
        assert!(!store.contains(RecordId::new(1)));
    }

    #[test]
    fn test_by_date_is_inclusive() {
        let mut store = RecordStore::new();
        store.add(record(1, "Zhang", "2025-07-28", "2025-07-30")).unwrap();
        store.add(record(2, "Lin", "2025-07-30", "2025-08-01")).unwrap();

        assert_eq!(ids(&store.by_date(date("2025-07-28"))), vec![1]);
        assert_eq!(ids(&store.by_date(date("2025-07-30"))), vec![1, 2]);
        assert_eq!(ids(&store.by_date(date("2025-08-02"))), Vec::<i64>::new());
    }

    #[test]
    fn test_by_month_includes_spanning_records() {
        let mut store = RecordStore::new();
        store.add(record(1, "Lin", "2025-07-31", "2025-08-01")).unwrap();
        store.add(record(2, "Chen", "2025-08-05", "2025-08-07")).unwrap();
        store.add(record(3, "Li", "2025-07-15", "2025-07-17")).unwrap();
        store.add(record(4, "Wu", "2025-12-30", "2026-01-02")).unwrap();

        assert_eq!(ids(&store.by_month(2025, 8)), vec![1, 2]);
        assert_eq!(ids(&store.by_month(2025, 7)), vec![1, 3]);
        assert_eq!(ids(&store.by_month(2026, 1)), vec![4]);
        assert!(store.by_month(2025, 13).is_empty());
    }

    #[test]
    fn test_replace_all_keeps_first_of_repeated_ids() {
        let mut store = RecordStore::new();
        store.add(record(9, "Old", "2025-07-01", "2025-07-01")).unwrap();

        let dropped = store.replace_all(vec![
            record(1, "Zhang", "2025-07-28", "2025-07-30"),
            record(1, "Imposter", "2025-07-28", "2025-07-30"),
            record(2, "Li", "2025-07-15", "2025-07-17"),
        ]);

        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].subject, "Imposter");
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(RecordId::new(1)).unwrap().subject, "Zhang");
        assert!(!store.contains(RecordId::new(9)));
    }

    #[test]
    fn test_subjects_are_sorted_and_distinct() {
        let mut store = RecordStore::new();
        store.add(record(1, "Zhang", "2025-07-28", "2025-07-30")).unwrap();
        store.add(record(2, "Li", "2025-07-15", "2025-07-17")).unwrap();
        store.add(record(3, "Zhang", "2025-09-01", "2025-09-02")).unwrap();
        assert_eq!(store.subjects(), vec!["Li", "Zhang"]);
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(2024, 2),
            Some((date("2024-02-01"), date("2024-02-29")))
        );
        assert_eq!(
            month_bounds(2025, 12),
            Some((date("2025-12-01"), date("2025-12-31")))
        );
        assert_eq!(month_bounds(2025, 0), None);
    }
}
