//! Local durable copy backed by libSQL

mod connection;
mod migrations;
mod slots;

pub use connection::Database;
pub use slots::{
    LibSqlSlots, LocalSlots, MemorySlots, RECORDS_SLOT, TOMBSTONES_SLOT, UNREADABLE_SLOT,
};
