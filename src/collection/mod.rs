//! Lazy collection: the chainable pipeline value
//!
//! A [`LazyCollection`] bundles a data source, a queue of pending operations
//! and an optional result limit. Chaining calls never run anything; they
//! return a new value with one more operation queued (or a new limit) and
//! leave the receiver untouched. Terminal calls (see `terminal.rs`) compile
//! and execute the queue.

mod chained;
mod terminal;

use std::fmt;
use std::rc::Rc;

use crate::error::{BoxError, Result};
use crate::pipeline::{BlockIter, ExecutionPlan, Executor, OpQueue, Operation, Planner};
use crate::source::{DataSource, IterSource, VecSource};

pub use chained::PipelineSource;

/// Immutable, deferred collection pipeline
pub struct LazyCollection<T> {
    source: Rc<dyn DataSource<T>>,
    queue: OpQueue<T>,
    limit: Option<usize>,
    // Shared by clones, fresh for every chaining step
    id: Rc<()>,
}

impl<T: 'static> LazyCollection<T> {
    /// Wrap a data source with an empty queue and no limit.
    pub fn new<S: DataSource<T> + 'static>(source: S) -> Self {
        Self::from_shared(Rc::new(source))
    }

    /// Wrap a source that other pipelines may share.
    pub fn from_shared(source: Rc<dyn DataSource<T>>) -> Self {
        LazyCollection {
            source,
            queue: OpQueue::new(),
            limit: None,
            id: Rc::new(()),
        }
    }

    /// Wrap a single-pass iterator; only the first terminal call can read it.
    pub fn from_cursor<I: Iterator<Item = T> + 'static>(iter: I) -> Self {
        Self::new(IterSource::new(iter))
    }

    fn with(&self, queue: OpQueue<T>, limit: Option<usize>) -> Self {
        LazyCollection {
            source: Rc::clone(&self.source),
            queue,
            limit,
            id: Rc::new(()),
        }
    }

    fn enqueue(&self, op: Operation<T>) -> Self {
        self.with(self.queue.append(op), self.limit)
    }

    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + 'static,
    {
        self.enqueue(Operation::map(f))
    }

    pub fn try_map<F, E>(&self, f: F) -> Self
    where
        F: Fn(T) -> std::result::Result<T, E> + 'static,
        E: Into<BoxError>,
    {
        self.enqueue(Operation::try_map(f))
    }

    pub fn filter<F>(&self, f: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.enqueue(Operation::filter(f))
    }

    pub fn try_filter<F, E>(&self, f: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<bool, E> + 'static,
        E: Into<BoxError>,
    {
        self.enqueue(Operation::try_filter(f))
    }

    /// Keep elements for which `f` is false.
    pub fn reject<F>(&self, f: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.enqueue(Operation::reject(f))
    }

    pub fn try_reject<F, E>(&self, f: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<bool, E> + 'static,
        E: Into<BoxError>,
    {
        self.enqueue(Operation::try_reject(f))
    }

    /// Stable sort of everything queued so far.
    pub fn sort<F>(&self, f: F) -> Self
    where
        F: Fn(&T, &T) -> std::cmp::Ordering + 'static,
    {
        self.enqueue(Operation::sort(f))
    }

    pub fn try_sort<F, E>(&self, f: F) -> Self
    where
        F: Fn(&T, &T) -> std::result::Result<std::cmp::Ordering, E> + 'static,
        E: Into<BoxError>,
    {
        self.enqueue(Operation::try_sort(f))
    }

    /// Limit the result to the first `n` elements, replacing any earlier limit.
    ///
    /// The queue is shared unchanged; only the limit differs.
    pub fn take(&self, n: usize) -> Self {
        self.with(self.queue.clone(), Some(n))
    }

    /// Transform into a pipeline over another element type.
    ///
    /// The new pipeline reads this one lazily, so a limit set downstream
    /// still bounds how much of this pipeline's source is read.
    pub fn map_into<U, F>(&self, f: F) -> LazyCollection<U>
    where
        U: 'static,
        F: Fn(T) -> U + 'static,
    {
        LazyCollection::new(PipelineSource::new(self.clone(), move |x| Ok(f(x))))
    }

    pub fn try_map_into<U, F, E>(&self, f: F) -> LazyCollection<U>
    where
        U: 'static,
        F: Fn(T) -> std::result::Result<U, E> + 'static,
        E: Into<BoxError>,
    {
        LazyCollection::new(PipelineSource::new(self.clone(), move |x| {
            f(x).map_err(crate::error::Error::callback)
        }))
    }

    /// Compile the queue without touching any data.
    pub fn plan(&self) -> ExecutionPlan<T> {
        Planner::plan(&self.queue)
    }

    /// Run all but the final block and hand back the final block lazily.
    pub(crate) fn stream(&self) -> Result<BlockIter<'_, T>> {
        Executor::new().stream(&self.plan(), &*self.source, self.limit)
    }
}

impl<T> LazyCollection<T> {
    /// Number of queued operations
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Size reported by the source, without running the queue.
    pub fn source_len(&self) -> Option<usize> {
        self.source.known_len()
    }

    /// True if `other` is this value or a clone of it.
    ///
    /// Every chaining call yields a distinct instance, even when it repeats
    /// the same step with the same arguments.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.id, &other.id)
    }
}

impl<T: Clone + 'static> LazyCollection<T> {
    /// Wrap an in-memory sequence.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self::new(VecSource::new(data))
    }
}

impl<T> Clone for LazyCollection<T> {
    fn clone(&self) -> Self {
        LazyCollection {
            source: Rc::clone(&self.source),
            queue: self.queue.clone(),
            limit: self.limit,
            id: Rc::clone(&self.id),
        }
    }
}

impl<T: Clone + 'static> From<Vec<T>> for LazyCollection<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<T: Clone + 'static> FromIterator<T> for LazyCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> fmt::Debug for LazyCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCollection")
            .field("queue", &self.queue)
            .field("limit", &self.limit)
            .field("source_len", &self.source.known_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_even(x: &i32) -> bool {
        x % 2 == 0
    }

    #[test]
    fn test_chaining_returns_new_values() {
        let base = LazyCollection::from_vec(vec![4, 5, 3, 1, 2]);
        let mapped = base.map(|x| x * 2);
        let again = mapped.map(|x| x * 2);

        assert_eq!(base.queue_len(), 0);
        assert_eq!(mapped.queue_len(), 1);
        assert_eq!(again.queue_len(), 2);
        assert!(!mapped.ptr_eq(&again));
        assert!(mapped.ptr_eq(&mapped.clone()));
    }

    #[test]
    fn test_same_step_twice_is_distinguishable() {
        let base = LazyCollection::from_vec(vec![1, 2, 3]);
        let a = base.filter(is_even);
        let b = base.filter(is_even);

        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn test_same_take_twice_is_distinguishable() {
        let base = LazyCollection::from_vec(vec![1, 2, 3]);
        let a = base.take(2);
        let b = base.take(2);
        assert!(!a.ptr_eq(&b));

        // Re-applying the current limit still yields a new instance
        let c = a.take(2);
        assert!(!a.ptr_eq(&c));
        assert!(!base.ptr_eq(&base.take(3)));
    }

    #[test]
    fn test_take_replaces_limit_without_enqueueing() {
        let base = LazyCollection::from_vec(vec![1, 2, 3]).reject(is_even);
        let limited = base.take(5).take(2);

        assert_eq!(limited.queue_len(), 1);
        assert_eq!(limited.limit(), Some(2));
        assert_eq!(base.limit(), None);
    }

    #[test]
    fn test_plan_shape() {
        let coll = LazyCollection::from_vec(vec![1, 2, 3])
            .map(|x| x + 1)
            .filter(is_even)
            .sort(|a, b| b.cmp(a))
            .map(|x| x * 3);

        let plan = coll.plan();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.barrier_count(), 1);
        assert_eq!(plan.fused_op_count(), 3);
    }

    #[test]
    fn test_source_len_is_raw_size() {
        let coll = LazyCollection::from_vec(vec![1, 2, 3, 4]).filter(is_even);
        assert_eq!(coll.source_len(), Some(4));

        let cursor = LazyCollection::from_cursor((0..10).filter(|x| x % 3 == 0));
        assert_eq!(cursor.source_len(), None);
    }

    #[test]
    fn test_debug_lists_queue() {
        let coll = LazyCollection::from_vec(vec![1]).map(|x| x).take(1);
        assert_eq!(
            format!("{:?}", coll),
            "LazyCollection { queue: [map], limit: Some(1), source_len: Some(1) }"
        );
    }
}
