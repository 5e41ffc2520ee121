use std::path::Path;
use thiserror::Error;

use crate::database::{Database, DbError};
use crate::excel::{infer_table_types, read_tables, ExcelError, SheetTable};
use crate::sync::storage::ROW_NUMBER_COLUMN;
use crate::sync::types::*;

/// Failure of a single synchronization pass
#[derive(Error, Debug)]
pub enum PassError {
    #[error("{0}")]
    Excel(#[from] ExcelError),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Table '{table}' row {row_number} has {found} cells, expected {expected}")]
    RowWidth {
        table: String,
        row_number: usize,
        expected: usize,
        found: usize,
    },
    #[error("Failed to upsert row {row_number} of table '{table}': {source}")]
    Upsert {
        table: String,
        row_number: usize,
        #[source]
        source: DbError,
    },
}

/// Mirror one sheet table into its destination table.
///
/// Rows are written one statement at a time; a failure on row N leaves rows
/// before N written and rows after N untouched.
pub fn sync_table(db: &Database, table: &SheetTable, options: &SyncOptions) -> Result<TableReport, PassError> {
    if table.rows.is_empty() {
        log::info!("Table [{}] has no data rows, skipping", table.name);
        return Ok(TableReport::skipped(&table.name));
    }

    let expected = table.headers.len();
    if let Some((idx, row)) = table.rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
        return Err(PassError::RowWidth {
            table: table.name.clone(),
            row_number: idx + 1,
            expected,
            found: row.len(),
        });
    }

    let types = infer_table_types(table, options.inference);
    let columns: Vec<_> = table.headers.iter().cloned().zip(types).collect();

    let existing = db.table_columns(&table.name)?;
    if let Some(existing) = &existing {
        warn_on_drift(&table.name, existing, &table.headers);
    }

    db.create_sheet_table(&table.name, &columns)?;

    for (idx, row) in table.rows.iter().enumerate() {
        let row_number = idx + 1;
        db.upsert_sheet_row(&table.name, &table.headers, row_number as i64, row)
            .map_err(|source| PassError::Upsert {
                table: table.name.clone(),
                row_number,
                source,
            })?;
    }

    Ok(TableReport {
        name: table.name.clone(),
        rows_upserted: table.rows.len(),
        skipped_empty: false,
        created: existing.is_none(),
    })
}

/// Header columns absent from the stored table, and stored columns absent
/// from the header. SQLite identifiers compare ASCII case-insensitively.
fn schema_drift<'a>(existing: &'a [String], headers: &'a [String]) -> (Vec<&'a str>, Vec<&'a str>) {
    let contains = |names: &[String], name: &str| names.iter().any(|n| n.eq_ignore_ascii_case(name));

    let missing = headers
        .iter()
        .filter(|h| !contains(existing, h))
        .map(String::as_str)
        .collect();
    let extra = existing
        .iter()
        .filter(|c| !c.eq_ignore_ascii_case(ROW_NUMBER_COLUMN) && !contains(headers, c))
        .map(String::as_str)
        .collect();

    (missing, extra)
}

/// Report columns that differ between a stored table and the sheet header
fn warn_on_drift(table: &str, existing: &[String], headers: &[String]) {
    let (missing, extra) = schema_drift(existing, headers);

    if !missing.is_empty() || !extra.is_empty() {
        log::warn!(
            "Table [{}] schema differs from sheet header (not in database: {:?}, not in sheet: {:?}); existing schema is kept",
            table,
            missing,
            extra
        );
    }
}

/// Synchronize every table declared on the workbook's first sheet
pub fn process_workbook(db: &Database, path: &Path, options: &SyncOptions) -> Result<PassReport, PassError> {
    let tables = read_tables(path)?;

    if tables.is_empty() {
        log::info!("No tables declared on the first sheet of {}", path.display());
    }

    let mut reports = Vec::with_capacity(tables.len());
    for table in &tables {
        log::info!("Processing sheet: [{}], Table: [{}]", table.sheet, table.name);
        reports.push(sync_table(db, table, options)?);
    }

    Ok(PassReport {
        path: path.to_path_buf(),
        tables: reports,
        finished_at: chrono::Utc::now(),
    })
}
