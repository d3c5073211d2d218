//! Data models for leavebook

mod conflict;
mod leave;
mod tombstone;

pub use conflict::Conflict;
pub use leave::{day_count, ranges_overlap, LeaveKind, LeaveRecord, RecordId};
pub use tombstone::{Tombstone, TombstoneDocument, TOMBSTONE_DOCUMENT_VERSION};
