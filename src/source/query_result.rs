//! Relational query result adapter
//!
//! Wraps a driver-level result handle and yields one [`Row`] per result row,
//! with column text coerced according to the column's declared type.
//! Rows are fetched by index, so the source can be replayed; only one cursor
//! may be open at a time.

use std::cell::Cell;
use std::fmt;

use serde_json::Value;
use tracing::trace;

use super::{Cursor, DataSource};
use crate::error::{Error, Result};

/// One decoded row: column name to coerced value, in column order
pub type Row = serde_json::Map<String, Value>;

/// Contract of a driver-level query result handle
pub trait ResultHandle {
    /// Kind of resource this handle wraps (e.g. "pgsql result").
    fn resource_type(&self) -> &str;

    fn num_rows(&self) -> usize;

    fn num_fields(&self) -> usize;

    fn field_name(&self, field: usize) -> String;

    /// Driver type name of a column (e.g. "int4", "bpchar").
    fn field_type(&self, field: usize) -> String;

    /// Raw text of every column of one row; `None` is SQL NULL.
    fn fetch_row(&self, row: usize) -> std::result::Result<Vec<Option<String>>, String>;
}

/// Column types with a dedicated coercion
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Int2,
    Int4,
    Float8,
    /// Fixed-width character
    Bpchar,
    Json,
    Bool,
    /// Passed through as text
    Other(String),
}

impl ColumnType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "int2" => ColumnType::Int2,
            "int4" => ColumnType::Int4,
            "float8" => ColumnType::Float8,
            "bpchar" => ColumnType::Bpchar,
            "json" => ColumnType::Json,
            "bool" => ColumnType::Bool,
            other => ColumnType::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ColumnType::Int2 => "int2",
            ColumnType::Int4 => "int4",
            ColumnType::Float8 => "float8",
            ColumnType::Bpchar => "bpchar",
            ColumnType::Json => "json",
            ColumnType::Bool => "bool",
            ColumnType::Other(name) => name,
        }
    }

    /// Convert driver text of this type into a value.
    ///
    /// Booleans accept `true`/`t` and `false`/`f`; any other token becomes null.
    pub fn coerce(&self, column: &str, text: String) -> Result<Value> {
        let fail = |reason: String, text: &str| Error::Coercion {
            column: column.to_string(),
            column_type: self.name().to_string(),
            value: text.to_string(),
            reason,
        };

        match self {
            ColumnType::Int2 | ColumnType::Int4 => text
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| fail(e.to_string(), &text)),
            // Non-finite floats have no JSON form and become null
            ColumnType::Float8 => text
                .trim()
                .parse::<f64>()
                .map(Value::from)
                .map_err(|e| fail(e.to_string(), &text)),
            ColumnType::Bpchar => Ok(Value::String(text.trim().to_string())),
            ColumnType::Json => serde_json::from_str(&text).map_err(|e| fail(e.to_string(), &text)),
            ColumnType::Bool => Ok(match text.as_str() {
                "true" | "t" => Value::Bool(true),
                "false" | "f" => Value::Bool(false),
                _ => Value::Null,
            }),
            ColumnType::Other(_) => Ok(Value::String(text)),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source adapter over a query result handle
///
/// Owns the handle; dropping the source (i.e. the last pipeline value holding
/// it) drops the handle and releases whatever the driver buffered.
pub struct QueryResultSource<H> {
    handle: H,
    columns: Vec<(String, ColumnType)>,
    rows: usize,
    busy: Cell<bool>,
}

impl<H: ResultHandle> QueryResultSource<H> {
    pub const EXPECTED_RESOURCE_TYPE: &'static str = "pgsql result";

    /// Validate the handle and read its column layout.
    pub fn new(handle: H) -> Result<Self> {
        if handle.resource_type() != Self::EXPECTED_RESOURCE_TYPE {
            return Err(Error::InvalidSource {
                expected: Self::EXPECTED_RESOURCE_TYPE.to_string(),
                found: handle.resource_type().to_string(),
            });
        }

        let columns = (0..handle.num_fields())
            .map(|i| (handle.field_name(i), ColumnType::from_name(&handle.field_type(i))))
            .collect();
        let rows = handle.num_rows();

        Ok(QueryResultSource {
            handle,
            columns,
            rows,
            busy: Cell::new(false),
        })
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Fetch and decode one row.
    pub fn row(&self, index: usize) -> Result<Row> {
        let raw = self.handle.fetch_row(index).map_err(Error::Driver)?;
        if raw.len() != self.columns.len() {
            return Err(Error::Driver(format!(
                "row {} has {} fields, expected {}",
                index,
                raw.len(),
                self.columns.len()
            )));
        }

        let mut row = Row::with_capacity(raw.len());
        for ((name, ty), value) in self.columns.iter().zip(raw) {
            let value = match value {
                Some(text) => ty.coerce(name, text)?,
                None => Value::Null,
            };
            row.insert(name.clone(), value);
        }
        Ok(row)
    }
}

impl<H: ResultHandle> DataSource<Row> for QueryResultSource<H> {
    fn cursor(&self) -> Result<Cursor<'_, Row>> {
        if self.busy.replace(true) {
            return Err(Error::SourceBusy);
        }
        trace!(rows = self.rows, "opening query result cursor");
        Ok(Box::new(RowCursor { source: self, next: 0 }))
    }

    fn known_len(&self) -> Option<usize> {
        Some(self.rows)
    }
}

impl<H> fmt::Debug for QueryResultSource<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResultSource")
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .field("busy", &self.busy.get())
            .finish()
    }
}

struct RowCursor<'a, H: ResultHandle> {
    source: &'a QueryResultSource<H>,
    next: usize,
}

impl<H: ResultHandle> Iterator for RowCursor<'_, H> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.source.rows {
            return None;
        }
        let row = self.source.row(self.next);
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.source.rows.saturating_sub(self.next);
        (left, Some(left))
    }
}

impl<H: ResultHandle> Drop for RowCursor<'_, H> {
    fn drop(&mut self) {
        self.source.busy.set(false);
    }
}
