//! Mirroring workbook tables into SQLite.
//!
//! Each destination table has a `row_number` primary key followed by one
//! column per sheet header; rows are upserted by their 1-based position.

pub mod processor;
pub mod storage;
pub mod types;

pub use processor::{process_workbook, sync_table, PassError};
pub use types::{PassReport, SyncOptions, TableReport};
