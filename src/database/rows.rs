//! Query result values
//!
//! SQLite is dynamically typed, so each cell is decoded by its runtime storage
//! class and rendered as a list of tuples (`[(1, 'Alice'), (2, None)]`), the
//! textual shape the model sees as a tool result.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};
use std::fmt;

/// A single decoded SQLite value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Decode the cell at `index` using its storage class
    pub fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
        let type_name = {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                return Ok(SqlValue::Null);
            }
            raw.type_info().name().to_uppercase()
        };

        let value = match type_name.as_str() {
            "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get_unchecked::<i64, _>(index)?),
            "REAL" | "NUMERIC" => SqlValue::Real(row.try_get_unchecked::<f64, _>(index)?),
            "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
            _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
        };
        Ok(value)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "None"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" on whole numbers
            SqlValue::Real(r) => write!(f, "{:?}", r),
            SqlValue::Text(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            SqlValue::Blob(bytes) => write!(f, "<blob {} bytes>", bytes.len()),
        }
    }
}

/// Decode every cell of every row
pub fn decode_rows(rows: &[SqliteRow]) -> Result<Vec<Vec<SqlValue>>, sqlx::Error> {
    rows.iter()
        .map(|row| {
            (0..row.len())
                .map(|index| SqlValue::decode(row, index))
                .collect()
        })
        .collect()
}

/// Render rows as a list of tuples
pub fn render_rows(rows: &[Vec<SqlValue>]) -> String {
    let rendered: Vec<String> = rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            if cells.len() == 1 {
                format!("({},)", cells[0])
            } else {
                format!("({})", cells.join(", "))
            }
        })
        .collect();

    format!("[{}]", rendered.join(", "))
}
