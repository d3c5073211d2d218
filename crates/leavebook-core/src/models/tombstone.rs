//! Tombstone models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

/// Schema version written into the shared tombstone document
pub const TOMBSTONE_DOCUMENT_VERSION: u32 = 1;

/// Marker that a record id was deleted and must never be reintroduced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tombstone {
    pub id: RecordId,
    pub deleted_at: DateTime<Utc>,
}

/// Shape of the shared `deleted_records.json` document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TombstoneDocument {
    #[serde(default)]
    pub deleted_records: Vec<RecordId>,
    /// ISO-8601 timestamp of the last write; empty when never written
    #[serde(default)]
    pub last_cleanup_time: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

const fn default_version() -> u32 {
    TOMBSTONE_DOCUMENT_VERSION
}

impl Default for TombstoneDocument {
    fn default() -> Self {
        Self {
            deleted_records: Vec::new(),
            last_cleanup_time: String::new(),
            version: TOMBSTONE_DOCUMENT_VERSION,
        }
    }
}

impl TombstoneDocument {
    /// Parsed `last_cleanup_time`, if present and well formed
    #[must_use]
    pub fn last_cleanup(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.last_cleanup_time.trim())
            .ok()
            .map(|time| time.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_parses_shared_shape() {
        let document: TombstoneDocument = serde_json::from_str(
            r#"{"deletedRecords":[1754800000000,42],"lastCleanupTime":"2025-08-09T10:00:00.000Z","version":1}"#,
        )
        .unwrap();

        assert_eq!(
            document.deleted_records,
            vec![RecordId::new(1_754_800_000_000), RecordId::new(42)]
        );
        assert_eq!(
            document.last_cleanup().map(|time| time.to_rfc3339()),
            Some("2025-08-09T10:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_document_tolerates_missing_fields() {
        let document: TombstoneDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(document, TombstoneDocument::default());
        assert_eq!(document.last_cleanup(), None);
    }
}
