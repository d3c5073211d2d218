//! Named slots holding the durable copy of the record set and the ledger

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{LeaveRecord, TombstoneDocument};
use crate::util::unix_timestamp_millis_now;

/// Slot holding the record array
pub const RECORDS_SLOT: &str = "leaveData";

/// Slot holding the tombstone document
pub const TOMBSTONES_SLOT: &str = "deletedRecords";

/// Slot holding pulled entries that failed the integrity check
pub const UNREADABLE_SLOT: &str = "unreadableRecords";

/// Key-value storage for the local durable copy (async)
#[allow(async_fn_in_trait)]
pub trait LocalSlots {
    /// Read a slot. `None` when it was never written.
    async fn read_slot(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a slot
    async fn write_slot(&self, key: &str, value: &str) -> Result<()>;

    async fn load_records(&self) -> Result<Option<Vec<LeaveRecord>>> {
        match self.read_slot(RECORDS_SLOT).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_records(&self, records: &[LeaveRecord]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.write_slot(RECORDS_SLOT, &raw).await
    }

    async fn load_tombstones(&self) -> Result<Option<TombstoneDocument>> {
        match self.read_slot(TOMBSTONES_SLOT).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_tombstones(&self, document: &TombstoneDocument) -> Result<()> {
        let raw = serde_json::to_string(document)?;
        self.write_slot(TOMBSTONES_SLOT, &raw).await
    }

    async fn load_unreadable(&self) -> Result<Vec<Value>> {
        match self.read_slot(UNREADABLE_SLOT).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_unreadable(&self, entries: &[Value]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.write_slot(UNREADABLE_SLOT, &raw).await
    }
}

/// libSQL implementation of `LocalSlots`
pub struct LibSqlSlots {
    db: tokio::sync::Mutex<Database>,
}

impl LibSqlSlots {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            db: tokio::sync::Mutex::new(db),
        }
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }
}

impl LocalSlots for LibSqlSlots {
    async fn read_slot(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT value FROM slots WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT OR REPLACE INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
                libsql::params![key, value, unix_timestamp_millis_now()],
            )
            .await?;
        Ok(())
    }
}

/// In-process slots for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemorySlots {
    values: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemorySlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full or read-only disk would
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl LocalSlots for MemorySlots {
    async fn read_slot(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database(format!("slot {key} is not writable")));
        }
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
