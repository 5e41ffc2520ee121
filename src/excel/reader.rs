use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::types::*;

/// Extensions of workbooks that can declare tables
const TABLE_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlam"];

/// Read every table declared on the first sheet of the workbook at `path`.
///
/// Tables are returned in declaration order. Each table's rows come from its
/// own declared range; trailing rows whose cells are all empty are dropped so
/// a freshly inserted, still blank table reads as having no data rows.
pub fn read_tables(path: &Path) -> Result<Vec<SheetTable>, ExcelError> {
    let display = path.display().to_string();

    if !path.exists() {
        return Err(ExcelError::file_not_found(&display));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !TABLE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ExcelError::invalid_format(format!(
            "Unsupported workbook format '{}': only xlsx workbooks declare tables",
            display
        )));
    }

    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ExcelError::read_error(format!("Failed to open workbook: {}", e)))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ExcelError::sheet_not_found("<first sheet>"))?;

    workbook
        .load_tables()
        .map_err(|e| ExcelError::read_error(format!("Failed to load tables: {}", e)))?;

    let names: Vec<String> = workbook
        .table_names_in_sheet(&sheet)
        .into_iter()
        .cloned()
        .collect();

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let table = workbook
            .table_by_name(&name)
            .map_err(|e| ExcelError::read_error(format!("Failed to read table '{}': {}", name, e)))?;

        tables.push(SheetTable {
            name: table.name().to_string(),
            sheet: sheet.clone(),
            headers: table.columns().to_vec(),
            rows: range_to_text(table.data()),
        });
    }

    Ok(tables)
}

/// Convert a range to rows of text, dropping trailing blank rows
fn range_to_text(range: &Range<Data>) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_text).collect())
        .collect();

    while rows
        .last()
        .is_some_and(|row| row.iter().all(|cell| cell.is_empty()))
    {
        rows.pop();
    }

    rows
}

/// Render a cell the way it should be stored
pub fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        Data::DateTime(dt) => format_excel_datetime(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

/// Format Excel datetime (days since 1899-12-30) to ISO 8601
fn format_excel_datetime(value: f64) -> String {
    let days = value.floor() as i64;
    let time_fraction = value.fract();

    let Some(date) = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::try_days(days)?))
    else {
        return value.to_string();
    };

    let total_seconds = ((time_fraction * 86400.0).round() as u32).min(86399);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let time = chrono::NaiveTime::from_hms_opt(hours, minutes, seconds).unwrap_or_default();
    chrono::NaiveDateTime::new(date, time)
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// Compute SHA-256 checksum of a file
pub fn compute_checksum(path: &Path) -> Result<String, ExcelError> {
    let mut file = File::open(path)
        .map_err(|e| ExcelError::read_error(format!("Failed to open file for checksum: {}", e)))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ExcelError::read_error(format!("Failed to read file for checksum: {}", e)))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rust_xlsxwriter::{Table, TableColumn, Workbook, Worksheet};
    use std::path::Path;

    /// Place a table with the given header at (`row`, `col`) and fill its data rows
    pub fn add_table(
        sheet: &mut Worksheet,
        name: &str,
        row: u32,
        col: u16,
        headers: &[&str],
        rows: &[&[&str]],
    ) {
        for (r, values) in rows.iter().enumerate() {
            for (c, value) in values.iter().enumerate() {
                let (r, c) = (row + 1 + r as u32, col + c as u16);
                match value.parse::<f64>() {
                    Ok(n) => sheet.write_number(r, c, n).unwrap(),
                    Err(_) => sheet.write_string(r, c, *value).unwrap(),
                };
            }
        }

        let columns: Vec<TableColumn> = headers
            .iter()
            .map(|h| TableColumn::new().set_header(*h))
            .collect();
        let table = Table::new().set_name(name).set_columns(&columns);
        let last_row = row + rows.len().max(1) as u32;
        let last_col = col + headers.len() as u16 - 1;
        sheet.add_table(row, col, last_row, last_col, &table).unwrap();
    }

    /// Write a workbook whose first sheet holds a single `People` table
    pub fn write_people(path: &Path, rows: &[&[&str]]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        add_table(sheet, "People", 0, 0, &["name", "age"], rows);
        workbook.save(path).unwrap();
    }
}
