use super::types::{ColumnType, SheetTable};

/// How column types are derived from a table's data rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceMode {
    /// Widen over every non-empty value in the column
    #[default]
    Widening,
    /// Use only the first data row's value
    SingleSample,
}

/// Infer the storage type of a single cell value.
///
/// Base-10 signed 64-bit integers are INTEGER, anything else that parses as a
/// 64-bit float is REAL, and everything else (including "") is TEXT.
pub fn infer_type(sample: &str) -> ColumnType {
    if sample.parse::<i64>().is_ok() {
        return ColumnType::Integer;
    }
    if sample.parse::<f64>().is_ok() {
        return ColumnType::Real;
    }
    ColumnType::Text
}

/// Infer a column type from all of its values.
///
/// Empty cells carry no type information and are skipped; a column with no
/// non-empty value is TEXT.
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a str>) -> ColumnType {
    values
        .into_iter()
        .filter(|v| !v.is_empty())
        .map(infer_type)
        .reduce(ColumnType::widen)
        .unwrap_or(ColumnType::Text)
}

/// Infer one type per header column of `table`
pub fn infer_table_types(table: &SheetTable, mode: InferenceMode) -> Vec<ColumnType> {
    (0..table.headers.len())
        .map(|col| match mode {
            InferenceMode::Widening => infer_column_type(table.column_values(col)),
            InferenceMode::SingleSample => infer_type(
                table
                    .rows
                    .first()
                    .and_then(|row| row.get(col))
                    .map(String::as_str)
                    .unwrap_or(""),
            ),
        })
        .collect()
}
