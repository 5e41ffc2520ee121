//! Excel module for reading workbook tables and watching a workbook for changes.
//!
//! This module provides:
//! - Reading the tables declared on a workbook's first sheet as text
//! - Column type inference for SQLite storage
//! - File change detection

pub mod types;
pub mod inference;
pub mod reader;
pub mod watcher;

// Re-export commonly used types and functions
pub use types::*;
pub use inference::{infer_table_types, InferenceMode};
pub use reader::{compute_checksum, read_tables};
pub use watcher::{ChangeFilter, SheetWatcher};
