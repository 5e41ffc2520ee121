use serde::Serialize;
use std::path::PathBuf;

use crate::excel::InferenceMode;

/// Options applied to every synchronization pass
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub inference: InferenceMode,
}

/// Outcome of synchronizing one sheet table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub name: String,
    pub rows_upserted: usize,
    /// Table had no data rows and was left untouched
    pub skipped_empty: bool,
    /// Destination table did not exist before this pass
    pub created: bool,
}

impl TableReport {
    pub fn skipped(name: impl Into<String>) -> Self {
        TableReport {
            name: name.into(),
            rows_upserted: 0,
            skipped_empty: true,
            created: false,
        }
    }
}

/// Outcome of one pass over a workbook
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub path: PathBuf,
    pub tables: Vec<TableReport>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl PassReport {
    pub fn rows_upserted(&self) -> usize {
        self.tables.iter().map(|t| t.rows_upserted).sum()
    }

    /// One-line JSON form for `--json` output
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
