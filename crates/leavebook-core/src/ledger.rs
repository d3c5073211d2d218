//! Tombstone ledger
//!
//! The shared store has no real delete: a record removed here would come back
//! on the next pull. Every deleted id is therefore remembered forever and
//! filtered out of each pulled snapshot. The ledger is never compacted.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{
    LeaveRecord, RecordId, Tombstone, TombstoneDocument, TOMBSTONE_DOCUMENT_VERSION,
};

/// Ids of deleted records with the time each was first seen deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TombstoneLedger {
    entries: BTreeMap<RecordId, DateTime<Utc>>,
    last_cleanup: Option<DateTime<Utc>>,
}

impl TombstoneLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a ledger from a stored or pulled document
    #[must_use]
    pub fn from_document(document: &TombstoneDocument) -> Self {
        let mut ledger = Self::new();
        ledger.merge_remote(document);
        ledger
    }

    #[must_use]
    pub fn is_deleted(&self, id: RecordId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Mark `id` deleted now. Returns `false` if it was already marked.
    pub fn mark_deleted(&mut self, id: RecordId) -> bool {
        self.mark_deleted_at(id, Utc::now())
    }

    /// Mark `id` deleted at `deleted_at`. An existing entry keeps its time.
    pub fn mark_deleted_at(&mut self, id: RecordId, deleted_at: DateTime<Utc>) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, deleted_at);
        self.last_cleanup = Some(
            self.last_cleanup
                .map_or(deleted_at, |previous| previous.max(deleted_at)),
        );
        true
    }

    /// Drop every record whose id is tombstoned
    #[must_use]
    pub fn filter(&self, records: Vec<LeaveRecord>) -> Vec<LeaveRecord> {
        records
            .into_iter()
            .filter(|record| !self.is_deleted(record.id))
            .collect()
    }

    /// Union a shared tombstone document into the ledger.
    ///
    /// Returns how many ids were new.
    pub fn merge_remote(&mut self, document: &TombstoneDocument) -> usize {
        let deleted_at = document.last_cleanup().unwrap_or_else(Utc::now);
        document
            .deleted_records
            .iter()
            .filter(|id| self.mark_deleted_at(**id, deleted_at))
            .count()
    }

    /// Render the shared document shape
    #[must_use]
    pub fn to_document(&self) -> TombstoneDocument {
        TombstoneDocument {
            deleted_records: self.entries.keys().copied().collect(),
            last_cleanup_time: self
                .last_cleanup
                .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default(),
            version: TOMBSTONE_DOCUMENT_VERSION,
        }
    }

    /// Record that the ledger was written at `at`
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_cleanup = Some(at);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tombstones(&self) -> impl Iterator<Item = Tombstone> + '_ {
        self.entries.iter().map(|(id, deleted_at)| Tombstone {
            id: *id,
            deleted_at: *deleted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record(id: i64) -> LeaveRecord {
        let day = NaiveDate::from_ymd_opt(2025, 8, 10).unwrap();
        LeaveRecord::new(RecordId::new(id), "Tang", day, day, day)
    }

    fn ids(records: &[LeaveRecord]) -> Vec<i64> {
        records.iter().map(|record| record.id.value()).collect()
    }

    #[test]
    fn test_mark_deleted_is_idempotent() {
        let mut ledger = TombstoneLedger::new();
        assert!(ledger.mark_deleted(RecordId::new(1)));
        let first = ledger.tombstones().next().unwrap().deleted_at;

        assert!(!ledger.mark_deleted(RecordId::new(1)));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.tombstones().next().unwrap().deleted_at, first);
    }

    #[test]
    fn test_filter_excludes_deleted_ids() {
        let mut ledger = TombstoneLedger::new();
        ledger.mark_deleted(RecordId::new(2));

        let kept = ledger.filter(vec![record(1), record(2), record(3)]);
        assert_eq!(ids(&kept), vec![1, 3]);
    }

    #[test]
    fn test_filter_stays_monotonic_across_pulls() {
        let mut ledger = TombstoneLedger::new();
        ledger.mark_deleted(RecordId::new(2));

        let pulls = [
            vec![record(2)],
            vec![record(3), record(2), record(1)],
            vec![record(1)],
            vec![record(2), record(2)],
        ];
        for pull in pulls {
            let kept = ledger.filter(pull);
            assert!(kept.iter().all(|record| record.id != RecordId::new(2)));
        }
    }

    #[test]
    fn test_merge_remote_unions_ids() {
        let mut ledger = TombstoneLedger::new();
        ledger.mark_deleted(RecordId::new(1));

        let document = TombstoneDocument {
            deleted_records: vec![RecordId::new(1), RecordId::new(5)],
            last_cleanup_time: "2025-08-09T10:00:00.000Z".to_string(),
            version: 1,
        };
        assert_eq!(ledger.merge_remote(&document), 1);
        assert!(ledger.is_deleted(RecordId::new(5)));
        assert_eq!(ledger.merge_remote(&document), 0);
    }

    #[test]
    fn test_document_round_trip_keeps_ids() {
        let mut ledger = TombstoneLedger::new();
        ledger.mark_deleted(RecordId::new(20));
        ledger.mark_deleted(RecordId::new(10));

        let document = ledger.to_document();
        assert_eq!(
            document.deleted_records,
            vec![RecordId::new(10), RecordId::new(20)]
        );
        assert!(document.last_cleanup().is_some());
        assert_eq!(document.version, TOMBSTONE_DOCUMENT_VERSION);

        let restored = TombstoneLedger::from_document(&document);
        assert!(restored.is_deleted(RecordId::new(10)));
        assert!(restored.is_deleted(RecordId::new(20)));
    }
}
