//! Intermediate Representation for pending pipeline operations
//!
//! A pipeline value records each chained request as an [`Operation`] in an
//! [`OpQueue`] before anything runs. The queue is persistent: appending
//! returns a new queue that shares every earlier node with the original.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::error::{BoxError, Error, Result};

/// Element transform
pub type MapFn<T> = Rc<dyn Fn(T) -> Result<T>>;

/// Element predicate
pub type FilterFn<T> = Rc<dyn Fn(&T) -> Result<bool>>;

/// Element comparator
pub type CompareFn<T> = Rc<dyn Fn(&T, &T) -> Result<Ordering>>;

/// A single pending operation
pub enum Operation<T> {
    /// Replace each element with the transform's result
    Map(MapFn<T>),

    /// Keep elements for which the predicate holds
    Filter(FilterFn<T>),

    /// Stable sort of everything produced so far
    Sort(CompareFn<T>),
}

impl<T: 'static> Operation<T> {
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(T) -> T + 'static,
    {
        Operation::Map(Rc::new(move |x: T| Ok(f(x))))
    }

    pub fn try_map<F, E>(f: F) -> Self
    where
        F: Fn(T) -> std::result::Result<T, E> + 'static,
        E: Into<BoxError>,
    {
        Operation::Map(Rc::new(move |x: T| f(x).map_err(Error::callback)))
    }

    pub fn filter<F>(f: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Operation::Filter(Rc::new(move |x: &T| Ok(f(x))))
    }

    pub fn try_filter<F, E>(f: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<bool, E> + 'static,
        E: Into<BoxError>,
    {
        Operation::Filter(Rc::new(move |x: &T| f(x).map_err(Error::callback)))
    }

    /// Filter with the predicate negated.
    pub fn reject<F>(f: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Operation::Filter(Rc::new(move |x: &T| Ok(!f(x))))
    }

    pub fn try_reject<F, E>(f: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<bool, E> + 'static,
        E: Into<BoxError>,
    {
        Operation::Filter(Rc::new(move |x: &T| f(x).map(|keep| !keep).map_err(Error::callback)))
    }

    pub fn sort<F>(f: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + 'static,
    {
        Operation::Sort(Rc::new(move |a: &T, b: &T| Ok(f(a, b))))
    }

    pub fn try_sort<F, E>(f: F) -> Self
    where
        F: Fn(&T, &T) -> std::result::Result<Ordering, E> + 'static,
        E: Into<BoxError>,
    {
        Operation::Sort(Rc::new(move |a: &T, b: &T| f(a, b).map_err(Error::callback)))
    }
}

impl<T> Operation<T> {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Map(_) => "map",
            Operation::Filter(_) => "filter",
            Operation::Sort(_) => "sort",
        }
    }
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        match self {
            Operation::Map(f) => Operation::Map(Rc::clone(f)),
            Operation::Filter(f) => Operation::Filter(Rc::clone(f)),
            Operation::Sort(f) => Operation::Sort(Rc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct Node<T> {
    op: Operation<T>,
    prev: Option<Rc<Node<T>>>,
}

/// Persistent, append-only operation queue
///
/// Stored newest-first as a shared linked list; [`OpQueue::to_vec`] yields
/// operations in enqueue (FIFO) order.
pub struct OpQueue<T> {
    tail: Option<Rc<Node<T>>>,
    len: usize,
}

impl<T> OpQueue<T> {
    /// Create empty queue
    pub fn new() -> Self {
        OpQueue { tail: None, len: 0 }
    }

    /// New queue with `op` appended; `self` is left untouched.
    pub fn append(&self, op: Operation<T>) -> Self {
        OpQueue {
            tail: Some(Rc::new(Node {
                op,
                prev: self.tail.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Operations in enqueue order
    pub fn to_vec(&self) -> Vec<Operation<T>> {
        let mut ops = Vec::with_capacity(self.len);
        let mut node = self.tail.as_deref();
        while let Some(n) = node {
            ops.push(n.op.clone());
            node = n.prev.as_deref();
        }
        ops.reverse();
        ops
    }

    /// True if both queues are the same instance (same newest node).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.tail, &other.tail) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> Clone for OpQueue<T> {
    fn clone(&self) -> Self {
        OpQueue {
            tail: self.tail.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for OpQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for OpQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

// Unlink iteratively so very long chains don't recurse on drop
impl<T> Drop for OpQueue<T> {
    fn drop(&mut self) {
        let mut next = self.tail.take();
        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.prev.take(),
                Err(_) => break,
            }
        }
    }
}
