pub mod check;
pub mod cleanup;
pub mod common;
pub mod completions;
pub mod day;
pub mod delete;
pub mod export;
pub mod list;
pub mod month;
pub mod submit;
pub mod sync;
pub mod watch;
