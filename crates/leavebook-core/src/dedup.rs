//! Duplicate detection
//!
//! A leave request submitted twice (double click, two tabs, two colleagues)
//! shows up as several records with the same name and dates. The earliest
//! submission wins; the rest are extraneous and get tombstoned so every
//! client converges on the same survivor.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::models::{LeaveRecord, RecordId};

/// Records sharing a `(subject, start, end)` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub canonical: LeaveRecord,
    pub extraneous: Vec<LeaveRecord>,
}

/// Result of collapsing duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Surviving records, in input order
    pub kept: Vec<LeaveRecord>,
    /// Ids of the dropped duplicates
    pub removed: BTreeSet<RecordId>,
}

impl DedupOutcome {
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty()
    }
}

type DuplicateKey<'a> = (&'a str, NaiveDate, NaiveDate);

fn duplicate_key(record: &LeaveRecord) -> DuplicateKey<'_> {
    (record.subject.as_str(), record.start_date, record.end_date)
}

/// Earliest submission first, lowest id on ties
fn precedence(record: &LeaveRecord) -> (NaiveDate, RecordId) {
    (record.submitted_on, record.id)
}

/// Every group with more than one member, in order of first appearance
#[must_use]
pub fn find_duplicate_groups(records: &[LeaveRecord]) -> Vec<DuplicateGroup> {
    let mut order: Vec<DuplicateKey<'_>> = Vec::new();
    let mut groups: HashMap<DuplicateKey<'_>, Vec<&LeaveRecord>> = HashMap::new();

    for record in records {
        let key = duplicate_key(record);
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(record);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let mut members = groups.remove(&key)?;
            if members.len() < 2 {
                return None;
            }
            members.sort_by_key(|record| precedence(record));
            let mut members = members.into_iter().cloned();
            let canonical = members.next()?;
            Some(DuplicateGroup {
                canonical,
                extraneous: members.collect(),
            })
        })
        .collect()
}

/// Collapse each duplicate group to its canonical member.
///
/// Deterministic and idempotent: running it on its own output removes
/// nothing.
#[must_use]
pub fn dedupe(records: Vec<LeaveRecord>) -> DedupOutcome {
    let removed = find_duplicate_groups(&records)
        .into_iter()
        .flat_map(|group| group.extraneous.into_iter().map(|record| record.id))
        .collect::<BTreeSet<_>>();

    if removed.is_empty() {
        return DedupOutcome {
            kept: records,
            removed,
        };
    }

    for id in &removed {
        tracing::debug!("Dropping duplicate leave record {id}");
    }

    let kept = records
        .into_iter()
        .filter(|record| !removed.contains(&record.id))
        .collect();
    DedupOutcome { kept, removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    fn record(id: i64, subject: &str, start: &str, end: &str, submitted: &str) -> LeaveRecord {
        LeaveRecord::new(
            RecordId::new(id),
            subject,
            date(start),
            date(end),
            date(submitted),
        )
    }

    fn ids(records: &[LeaveRecord]) -> Vec<i64> {
        records.iter().map(|record| record.id.value()).collect()
    }

    #[test]
    fn test_dedupe_keeps_earliest_submission() {
        let outcome = dedupe(vec![
            record(1, "A", "2025-01-01", "2025-01-02", "2025-01-01"),
            record(2, "A", "2025-01-01", "2025-01-02", "2025-01-03"),
        ]);

        assert_eq!(ids(&outcome.kept), vec![1]);
        assert_eq!(outcome.removed, BTreeSet::from([RecordId::new(2)]));
    }

    #[test]
    fn test_dedupe_prefers_submission_date_over_position() {
        let outcome = dedupe(vec![
            record(5, "A", "2025-01-01", "2025-01-02", "2025-01-03"),
            record(9, "B", "2025-03-01", "2025-03-01", "2025-02-01"),
            record(8, "A", "2025-01-01", "2025-01-02", "2024-12-30"),
        ]);

        assert_eq!(ids(&outcome.kept), vec![9, 8]);
        assert_eq!(outcome.removed, BTreeSet::from([RecordId::new(5)]));
    }

    #[test]
    fn test_dedupe_breaks_ties_by_lowest_id() {
        let outcome = dedupe(vec![
            record(30, "A", "2025-01-01", "2025-01-02", "2025-01-01"),
            record(10, "A", "2025-01-01", "2025-01-02", "2025-01-01"),
            record(20, "A", "2025-01-01", "2025-01-02", "2025-01-01"),
        ]);

        assert_eq!(ids(&outcome.kept), vec![10]);
        assert_eq!(
            outcome.removed,
            BTreeSet::from([RecordId::new(20), RecordId::new(30)])
        );
    }

    #[test]
    fn test_dedupe_ignores_overlapping_but_distinct_periods() {
        let records = vec![
            record(1, "A", "2025-01-01", "2025-01-02", "2025-01-01"),
            record(2, "A", "2025-01-01", "2025-01-03", "2025-01-01"),
            record(3, "B", "2025-01-01", "2025-01-02", "2025-01-01"),
        ];
        let outcome = dedupe(records.clone());
        assert!(outcome.is_clean());
        assert_eq!(outcome.kept, records);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let records = vec![
            record(4, "A", "2025-01-01", "2025-01-02", "2025-01-02"),
            record(2, "A", "2025-01-01", "2025-01-02", "2025-01-01"),
            record(3, "B", "2025-02-01", "2025-02-03", "2025-01-05"),
            record(1, "B", "2025-02-01", "2025-02-03", "2025-01-05"),
            record(7, "C", "2025-04-01", "2025-04-01", "2025-03-01"),
        ];

        let first = dedupe(records);
        let second = dedupe(first.kept.clone());
        assert!(second.is_clean());
        assert_eq!(second.kept, first.kept);
        assert_eq!(ids(&first.kept), vec![2, 1, 7]);
    }

    #[test]
    fn test_find_duplicate_groups_reports_canonical_member() {
        let groups = find_duplicate_groups(&[
            record(2, "A", "2025-01-01", "2025-01-02", "2025-01-03"),
            record(1, "A", "2025-01-01", "2025-01-02", "2025-01-01"),
            record(3, "B", "2025-01-01", "2025-01-02", "2025-01-01"),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].canonical.id, RecordId::new(1));
        assert_eq!(ids(&groups[0].extraneous), vec![2]);
    }
}
