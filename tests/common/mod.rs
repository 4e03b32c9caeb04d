//! Shared helpers for integration tests

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use lazyseq::{Cursor, DataSource, ResultHandle};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber honoring RUST_LOG (once per process).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory source that records how many elements were pulled
pub struct CountingSource<T> {
    data: Vec<T>,
    pulls: Rc<Cell<usize>>,
}

impl<T> CountingSource<T> {
    pub fn new(data: Vec<T>) -> (Self, Rc<Cell<usize>>) {
        let pulls = Rc::new(Cell::new(0));
        (
            CountingSource {
                data,
                pulls: Rc::clone(&pulls),
            },
            pulls,
        )
    }
}

impl<T: Clone> DataSource<T> for CountingSource<T> {
    fn cursor(&self) -> lazyseq::Result<Cursor<'_, T>> {
        let pulls = Rc::clone(&self.pulls);
        Ok(Box::new(self.data.iter().map(move |x| {
            pulls.set(pulls.get() + 1);
            Ok(x.clone())
        })))
    }
}

/// Result handle over fixed rows of driver text
pub struct MemoryResult {
    pub resource_type: String,
    pub fields: Vec<(String, String)>,
    pub rows: Vec<Vec<Option<String>>>,
    pub fetches: Rc<Cell<usize>>,
}

impl MemoryResult {
    pub fn new(fields: &[(&str, &str)], rows: Vec<Vec<Option<&str>>>) -> Self {
        MemoryResult {
            resource_type: "pgsql result".to_string(),
            fields: fields
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.to_string()))
                .collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
            fetches: Rc::new(Cell::new(0)),
        }
    }
}

impl ResultHandle for MemoryResult {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn num_fields(&self) -> usize {
        self.fields.len()
    }

    fn field_name(&self, field: usize) -> String {
        self.fields[field].0.clone()
    }

    fn field_type(&self, field: usize) -> String {
        self.fields[field].1.clone()
    }

    fn fetch_row(&self, row: usize) -> Result<Vec<Option<String>>, String> {
        self.fetches.set(self.fetches.get() + 1);
        self.rows
            .get(row)
            .cloned()
            .ok_or_else(|| format!("row {} out of range", row))
    }
}
