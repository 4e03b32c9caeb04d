//! Data sources feeding a pipeline
//!
//! The engine only needs an ordered, forward cursor over elements. Sources that
//! can report their size without iterating do so through [`DataSource::known_len`].

pub mod query_result;

use std::cell::RefCell;
use std::fmt;

use crate::error::{Error, Result};

pub use query_result::{ColumnType, QueryResultSource, ResultHandle, Row};

/// Forward cursor over a source's elements
pub type Cursor<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// Capability the execution engine requires from any producer of elements.
///
/// Elements must come out in a deterministic order. A source backed by a
/// stateful cursor may refuse a second cursor ([`Error::SourceConsumed`]) or a
/// concurrent one ([`Error::SourceBusy`]).
pub trait DataSource<T> {
    /// Open a cursor positioned at the first element.
    fn cursor(&self) -> Result<Cursor<'_, T>>;

    /// Total element count, if known without iterating.
    fn known_len(&self) -> Option<usize> {
        None
    }
}

/// In-memory, replayable source
#[derive(Clone, Debug, Default)]
pub struct VecSource<T> {
    data: Vec<T>,
}

impl<T> VecSource<T> {
    pub fn new(data: Vec<T>) -> Self {
        VecSource { data }
    }
}

impl<T: Clone> DataSource<T> for VecSource<T> {
    fn cursor(&self) -> Result<Cursor<'_, T>> {
        Ok(Box::new(self.data.iter().cloned().map(Ok)))
    }

    fn known_len(&self) -> Option<usize> {
        Some(self.data.len())
    }
}

/// Single-pass source over a stateful iterator
///
/// The first cursor takes ownership of the iterator; any later request fails
/// with [`Error::SourceConsumed`].
pub struct IterSource<I> {
    iter: RefCell<Option<I>>,
    len: Option<usize>,
}

impl<I: Iterator> IterSource<I> {
    pub fn new(iter: I) -> Self {
        let len = match iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(lower),
            _ => None,
        };
        IterSource {
            iter: RefCell::new(Some(iter)),
            len,
        }
    }

    /// True once a cursor has taken the iterator.
    pub fn is_consumed(&self) -> bool {
        self.iter.borrow().is_none()
    }
}

impl<I: Iterator> DataSource<I::Item> for IterSource<I> {
    fn cursor(&self) -> Result<Cursor<'_, I::Item>> {
        let iter = self.iter.borrow_mut().take().ok_or(Error::SourceConsumed)?;
        Ok(Box::new(iter.map(Ok)))
    }

    fn known_len(&self) -> Option<usize> {
        if self.is_consumed() {
            None
        } else {
            self.len
        }
    }
}

impl<I> fmt::Debug for IterSource<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterSource")
            .field("consumed", &self.iter.borrow().is_none())
            .field("len", &self.len)
            .finish()
    }
}
