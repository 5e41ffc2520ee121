use rusqlite::{params_from_iter, types::Value, OptionalExtension};

use crate::database::{Database, DbError};
use crate::excel::ColumnType;

/// Name of the synthetic primary key holding the 1-based row position
pub const ROW_NUMBER_COLUMN: &str = "row_number";

/// Back-quote an identifier, doubling any embedded back-quote
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `CREATE TABLE IF NOT EXISTS` statement for a sheet table
pub fn create_table_sql(table: &str, columns: &[(String, ColumnType)]) -> String {
    let mut definitions = vec![format!("{} INTEGER PRIMARY KEY", quote_ident(ROW_NUMBER_COLUMN))];
    definitions.extend(
        columns
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.as_sql())),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        quote_ident(table),
        definitions.join(", ")
    )
}

/// `INSERT OR REPLACE` statement keyed by row number
pub fn upsert_sql(table: &str, headers: &[String]) -> String {
    let columns: Vec<String> = std::iter::once(ROW_NUMBER_COLUMN)
        .chain(headers.iter().map(String::as_str))
        .map(quote_ident)
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({});",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

impl Database {
    /// Column names of an existing table, `None` if it does not exist
    pub fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                [table],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if !exists {
            return Ok(None);
        }

        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let rows = stmt.query_map([table], |row| row.get::<_, String>(0))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }

        Ok(Some(columns))
    }

    /// Create the destination table for a sheet table if it is absent.
    ///
    /// An existing table keeps its schema.
    pub fn create_sheet_table(&self, table: &str, columns: &[(String, ColumnType)]) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        conn.execute(&create_table_sql(table, columns), [])?;
        Ok(())
    }

    /// Insert or replace one data row at `row_number`
    pub fn upsert_sheet_row(
        &self,
        table: &str,
        headers: &[String],
        row_number: i64,
        values: &[String],
    ) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let mut stmt = conn.prepare_cached(&upsert_sql(table, headers))?;

        let params = std::iter::once(Value::Integer(row_number))
            .chain(values.iter().cloned().map(Value::Text));
        stmt.execute(params_from_iter(params))?;

        Ok(())
    }

    /// Number of rows currently stored in `table`
    pub fn count_rows(&self, table: &str) -> Result<i64, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
