//! Execution plan with stages
//!
//! A compiled plan is an ordered list of stages: fused blocks of per-element
//! work separated by sort barriers. Plans are derived on every terminal call
//! and never stored on the pipeline value.

use std::fmt;

use super::ir::{CompareFn, FilterFn, MapFn};

/// Per-element operation inside a fused block
pub enum BlockOp<T> {
    Map(MapFn<T>),
    Filter(FilterFn<T>),
}

impl<T> Clone for BlockOp<T> {
    fn clone(&self) -> Self {
        match self {
            BlockOp::Map(f) => BlockOp::Map(f.clone()),
            BlockOp::Filter(f) => BlockOp::Filter(f.clone()),
        }
    }
}

impl<T> fmt::Debug for BlockOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockOp::Map(_) => f.write_str("map"),
            BlockOp::Filter(_) => f.write_str("filter"),
        }
    }
}

/// A unit of execution
pub enum Stage<T> {
    /// Contiguous map/filter run, evaluated in one pass
    Block(Vec<BlockOp<T>>),

    /// Full materialization followed by a stable sort
    Barrier(CompareFn<T>),
}

impl<T> Stage<T> {
    pub fn is_block(&self) -> bool {
        matches!(self, Stage::Block(_))
    }

    pub fn is_barrier(&self) -> bool {
        matches!(self, Stage::Barrier(_))
    }

    /// Number of fused operations (0 for a barrier)
    pub fn op_count(&self) -> usize {
        match self {
            Stage::Block(ops) => ops.len(),
            Stage::Barrier(_) => 0,
        }
    }
}

impl<T> Clone for Stage<T> {
    fn clone(&self) -> Self {
        match self {
            Stage::Block(ops) => Stage::Block(ops.clone()),
            Stage::Barrier(cmp) => Stage::Barrier(cmp.clone()),
        }
    }
}

impl<T> fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Block(ops) => f.debug_tuple("Block").field(ops).finish(),
            Stage::Barrier(_) => f.write_str("Barrier"),
        }
    }
}

/// Complete execution plan for a pipeline
///
/// Built by the planner, it always ends in exactly one block.
pub struct ExecutionPlan<T> {
    /// Stages to execute in order
    pub stages: Vec<Stage<T>>,
}

impl<T> ExecutionPlan<T> {
    /// Create empty execution plan
    pub fn new() -> Self {
        ExecutionPlan { stages: Vec::new() }
    }

    /// Add a stage to the plan
    pub fn push(&mut self, stage: Stage<T>) {
        self.stages.push(stage);
    }

    /// Number of stages in plan
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Number of full passes forced by sorts
    pub fn barrier_count(&self) -> usize {
        self.stages.iter().filter(|s| s.is_barrier()).count()
    }

    /// Total map/filter operations across all blocks
    pub fn fused_op_count(&self) -> usize {
        self.stages.iter().map(Stage::op_count).sum()
    }
}

impl<T> Clone for ExecutionPlan<T> {
    fn clone(&self) -> Self {
        ExecutionPlan {
            stages: self.stages.clone(),
        }
    }
}

impl<T> Default for ExecutionPlan<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ExecutionPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("stages", &self.stages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_stage_creation() {
        let block: Stage<i32> = Stage::Block(vec![
            BlockOp::Map(Rc::new(|x: i32| Ok(x + 1))),
            BlockOp::Filter(Rc::new(|x: &i32| Ok(*x > 0))),
        ]);
        assert!(block.is_block());
        assert_eq!(block.op_count(), 2);

        let barrier: Stage<i32> = Stage::Barrier(Rc::new(|a: &i32, b: &i32| Ok(a.cmp(b))));
        assert!(barrier.is_barrier());
        assert_eq!(barrier.op_count(), 0);
    }

    #[test]
    fn test_execution_plan() {
        let mut plan: ExecutionPlan<i32> = ExecutionPlan::new();
        assert!(plan.is_empty());

        plan.push(Stage::Block(vec![]));
        plan.push(Stage::Barrier(Rc::new(|a: &i32, b: &i32| Ok(a.cmp(b)))));
        plan.push(Stage::Block(vec![BlockOp::Map(Rc::new(|x: i32| Ok(x * 2)))]));

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.barrier_count(), 1);
        assert_eq!(plan.fused_op_count(), 1);
        assert_eq!(
            format!("{:?}", plan),
            "ExecutionPlan { stages: [Block([]), Barrier, Block([map])] }"
        );
    }
}
