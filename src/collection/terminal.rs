//! Terminal operations
//!
//! Each call compiles the queue, executes it against the source and consumes
//! the fresh result. Nothing is cached between calls.

use std::hash::Hash;

use indexmap::IndexMap;

use super::LazyCollection;
use crate::error::{BoxError, Error, Result};
use crate::pipeline::{ExecutionResult, Executor};

impl<T: 'static> LazyCollection<T> {
    /// Run the pipeline and return the concrete result.
    pub fn execute(&self) -> Result<Vec<T>> {
        self.execute_with_stats().map(|result| result.value)
    }

    /// Run the pipeline, returning execution statistics alongside the result.
    pub fn execute_with_stats(&self) -> Result<ExecutionResult<T>> {
        Executor::new().execute(&self.plan(), &*self.source, self.limit)
    }

    /// Alias of [`execute`](Self::execute).
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.execute()
    }

    /// Owning iterator over a freshly executed result.
    pub fn iter(&self) -> Result<std::vec::IntoIter<T>> {
        self.execute().map(Vec::into_iter)
    }

    /// First element, running with the limit set to one.
    ///
    /// An empty result is `Ok(None)`, not an error.
    pub fn first(&self) -> Result<Option<T>> {
        Ok(self.take(1).execute()?.into_iter().next())
    }

    /// First element satisfying `f`.
    pub fn find<F>(&self, f: F) -> Result<Option<T>>
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.filter(f).first()
    }

    pub fn try_find<F, E>(&self, f: F) -> Result<Option<T>>
    where
        F: Fn(&T) -> std::result::Result<bool, E> + 'static,
        E: Into<BoxError>,
    {
        self.try_filter(f).first()
    }

    /// True if `f` holds for every element (vacuously true when empty).
    pub fn every<F>(&self, mut f: F) -> Result<bool>
    where
        F: FnMut(&T) -> bool,
    {
        Ok(self.execute()?.iter().all(|x| f(x)))
    }

    /// True if `f` holds for at least one element.
    pub fn some<F>(&self, mut f: F) -> Result<bool>
    where
        F: FnMut(&T) -> bool,
    {
        Ok(self.execute()?.iter().any(|x| f(x)))
    }

    /// Fold the result into an accumulator starting from `seed`.
    pub fn fold<A, F>(&self, seed: A, f: F) -> Result<A>
    where
        F: FnMut(A, T) -> A,
    {
        Ok(self.execute()?.into_iter().fold(seed, f))
    }

    pub fn try_fold<A, F, E>(&self, seed: A, mut f: F) -> Result<A>
    where
        F: FnMut(A, T) -> std::result::Result<A, E>,
        E: Into<BoxError>,
    {
        self.execute()?
            .into_iter()
            .try_fold(seed, |acc, x| f(acc, x).map_err(Error::callback))
    }

    /// Fold without a seed: the first element is the initial accumulator and
    /// folding starts at the second. `Ok(None)` when the result is empty.
    pub fn reduce<F>(&self, f: F) -> Result<Option<T>>
    where
        F: FnMut(T, T) -> T,
    {
        Ok(self.execute()?.into_iter().reduce(f))
    }

    /// Group elements into per-key buckets.
    ///
    /// Keys iterate in first-encounter order; each bucket keeps result order.
    pub fn group_by<K, F>(&self, mut key: F) -> Result<IndexMap<K, Vec<T>>>
    where
        K: Hash + Eq,
        F: FnMut(&T) -> K,
    {
        let mut groups: IndexMap<K, Vec<T>> = IndexMap::new();
        for value in self.execute()? {
            groups.entry(key(&value)).or_default().push(value);
        }
        Ok(groups)
    }

    /// Map each key to the last element producing it.
    ///
    /// Keys iterate in first-encounter order.
    pub fn index_by<K, F>(&self, mut key: F) -> Result<IndexMap<K, T>>
    where
        K: Hash + Eq,
        F: FnMut(&T) -> K,
    {
        let mut index = IndexMap::new();
        for value in self.execute()? {
            index.insert(key(&value), value);
        }
        Ok(index)
    }

    /// Call `f` on every element for its side effects and return the receiver.
    pub fn each<F, R>(&self, mut f: F) -> Result<&Self>
    where
        F: FnMut(T) -> R,
    {
        for value in self.execute()? {
            f(value);
        }
        Ok(self)
    }

    /// Length of the executed result, not of the raw source.
    pub fn count(&self) -> Result<usize> {
        let mut stream = self.stream()?;
        let mut n = 0;
        for item in &mut stream {
            item?;
            n += 1;
        }
        Ok(n)
    }
}
