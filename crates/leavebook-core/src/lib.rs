//! leavebook-core - Core library for leavebook
//!
//! This crate keeps a client's cached copy of a shared leave record set
//! consistent with a remote, append-mostly store. It contains the record
//! models, the in-memory store, the tombstone ledger, duplicate and conflict
//! detection, the local durable copy, and the sync engine that ties them
//! together.

pub mod config;
pub mod conflict;
pub mod db;
pub mod dedup;
pub mod error;
pub mod export;
pub mod integrity;
pub mod ledger;
pub mod models;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;
pub mod validation;

pub use error::{Error, Result};
pub use models::{Conflict, LeaveKind, LeaveRecord, RecordId, TombstoneDocument};
pub use store::RecordStore;
pub use sync::{SyncEngine, SyncEvent, SyncSettings};
pub use validation::{LeaveRequest, ValidationError};
