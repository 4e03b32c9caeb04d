//! Pipeline executor
//!
//! Executes an ExecutionPlan against a data source. Blocks pull elements one
//! at a time and run every fused operation on an element before pulling the
//! next; barriers sort the materialized output of the previous block.
//!
//! When a limit is set, the final block stops pulling as soon as it has
//! produced that many elements, so the rest of the source is never read.

use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;

use tracing::{debug, instrument};

use super::execution_plan::{BlockOp, ExecutionPlan, Stage};
use super::ir::CompareFn;
use crate::error::Result;
use crate::source::{Cursor, DataSource};

/// Execution statistics for performance measurement
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Number of stages executed
    pub stages_executed: usize,

    /// Number of fused blocks executed
    pub blocks_executed: usize,

    /// Number of sort barriers executed
    pub barriers_executed: usize,

    /// Elements read from the data source
    pub source_pulls: usize,

    /// Elements pulled by blocks, summed over all blocks
    pub elements_processed: usize,

    /// The final block stopped at the limit
    pub early_exit: bool,
}

/// Pipeline executor
pub struct Executor {
    stats: ExecutionStats,
}

impl Executor {
    /// Create a new executor
    pub fn new() -> Self {
        Executor {
            stats: ExecutionStats::default(),
        }
    }

    /// Execute a plan against a source, producing a fresh result sequence.
    ///
    /// Any callback failure aborts the whole execution; no partial result is
    /// returned.
    #[instrument(
        name = "executor::execute",
        level = "trace",
        skip_all,
        fields(stages = plan.len(), limit = ?limit)
    )]
    pub fn execute<'a, T: 'a>(
        &mut self,
        plan: &ExecutionPlan<T>,
        source: &'a dyn DataSource<T>,
        limit: Option<usize>,
    ) -> Result<ExecutionResult<T>> {
        let (mut tail, pulls, planned_tail) = self.prepare(plan, source, limit)?;
        let value = (&mut tail).collect::<Result<Vec<T>>>()?;

        if planned_tail {
            self.stats.stages_executed += 1;
            self.stats.blocks_executed += 1;
        }
        self.stats.elements_processed += tail.pulled();
        self.stats.early_exit = tail.reached_bound();
        self.stats.source_pulls = pulls.get();

        if self.stats.early_exit {
            debug!(
                limit = ?limit,
                source_pulls = self.stats.source_pulls,
                "stopped pulling at limit"
            );
        }
        debug!(
            stages = self.stats.stages_executed,
            barriers = self.stats.barriers_executed,
            source_pulls = self.stats.source_pulls,
            produced = value.len(),
            "execution complete"
        );

        Ok(ExecutionResult {
            value,
            stats: self.stats.clone(),
        })
    }

    /// Run every stage but the last and return the final block as a lazy
    /// iterator, bounded by `limit`.
    ///
    /// The source stays borrowed (and a stateful source stays busy) until the
    /// iterator is dropped.
    pub fn stream<'a, T: 'a>(
        &mut self,
        plan: &ExecutionPlan<T>,
        source: &'a dyn DataSource<T>,
        limit: Option<usize>,
    ) -> Result<BlockIter<'a, T>> {
        self.prepare(plan, source, limit).map(|(tail, _, _)| tail)
    }

    fn prepare<'a, T: 'a>(
        &mut self,
        plan: &ExecutionPlan<T>,
        source: &'a dyn DataSource<T>,
        limit: Option<usize>,
    ) -> Result<(BlockIter<'a, T>, Rc<Cell<usize>>, bool)> {
        let pulls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&pulls);
        let mut pending: Option<Cursor<'a, T>> = Some(Box::new(
            source
                .cursor()?
                .inspect(move |_| counter.set(counter.get() + 1)),
        ));
        let mut current: Vec<T> = Vec::new();

        // Planner output always ends in a block; a hand-built plan ending in
        // a barrier gets an empty trailing block that is not counted as a stage
        let (last, prefix, planned_tail) = match plan.stages.split_last() {
            Some((Stage::Block(ops), prefix)) => (ops.clone(), prefix, true),
            _ => (Vec::new(), &plan.stages[..], false),
        };

        for stage in prefix {
            let input = take_input(&mut pending, &mut current);
            match stage {
                Stage::Block(ops) => {
                    let mut block = BlockIter::new(ops.clone(), input, None);
                    current = (&mut block).collect::<Result<Vec<T>>>()?;
                    self.stats.blocks_executed += 1;
                    self.stats.elements_processed += block.pulled();
                }
                Stage::Barrier(cmp) => {
                    let items = input.collect::<Result<Vec<T>>>()?;
                    current = stable_sort(items, cmp)?;
                    self.stats.barriers_executed += 1;
                }
            }
            self.stats.stages_executed += 1;
        }

        let input = take_input(&mut pending, &mut current);
        Ok((BlockIter::new(last, input, limit), pulls, planned_tail))
    }

    /// Get execution statistics
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of pipeline execution
#[derive(Debug)]
pub struct ExecutionResult<T> {
    pub value: Vec<T>,
    pub stats: ExecutionStats,
}

fn take_input<'a, T: 'a>(
    pending: &mut Option<Cursor<'a, T>>,
    current: &mut Vec<T>,
) -> Cursor<'a, T> {
    match pending.take() {
        Some(cursor) => cursor,
        None => Box::new(std::mem::take(current).into_iter().map(Ok)),
    }
}

/// Fused evaluation of one block over an input cursor
///
/// Each pulled element runs through the block's operations in order; a
/// failing filter drops it without running the remaining operations.
pub struct BlockIter<'a, T> {
    ops: Vec<BlockOp<T>>,
    input: Cursor<'a, T>,
    bound: Option<usize>,
    pulled: usize,
    emitted: usize,
    failed: bool,
}

impl<'a, T> BlockIter<'a, T> {
    pub fn new(ops: Vec<BlockOp<T>>, input: Cursor<'a, T>, bound: Option<usize>) -> Self {
        BlockIter {
            ops,
            input,
            bound,
            pulled: 0,
            emitted: 0,
            failed: false,
        }
    }

    /// Elements pulled from the input so far
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    /// Elements that survived the block so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// True once the block has produced `bound` elements
    pub fn reached_bound(&self) -> bool {
        self.bound.is_some_and(|b| self.emitted >= b)
    }

    fn apply(&self, mut value: T) -> Result<Option<T>> {
        for op in &self.ops {
            match op {
                BlockOp::Map(f) => value = f(value)?,
                BlockOp::Filter(p) => {
                    if !p(&value)? {
                        return Ok(None);
                    }
                }
            }
        }
        Ok(Some(value))
    }
}

impl<T> Iterator for BlockIter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reached_bound() {
            return None;
        }

        loop {
            let value = match self.input.next()? {
                Ok(value) => value,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };
            self.pulled += 1;

            match self.apply(value) {
                Ok(Some(value)) => {
                    self.emitted += 1;
                    return Some(Ok(value));
                }
                Ok(None) => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Stable merge sort with a fallible comparator
///
/// Equal elements keep their input order. The first comparator error aborts
/// the sort.
fn stable_sort<T>(mut items: Vec<T>, cmp: &CompareFn<T>) -> Result<Vec<T>> {
    if items.len() <= 1 {
        return Ok(items);
    }

    let right = items.split_off(items.len() / 2);
    let left = stable_sort(items, cmp)?;
    let right = stable_sort(right, cmp)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        // Take from the right only when strictly smaller
        let take_right = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => cmp(b, a)? == Ordering::Less,
            _ => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        out.extend(next);
    }
    out.extend(left);
    out.extend(right);

    Ok(out)
}
