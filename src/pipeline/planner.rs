//! Pipeline planner
//!
//! Converts an OpQueue into an ExecutionPlan by:
//! 1. Fusing contiguous map/filter operations into one block
//! 2. Closing the block at every sort, which becomes its own barrier stage
//!
//! The result is zero or more block/barrier pairs followed by exactly one
//! trailing block, which may be empty.

use tracing::{instrument, trace};

use super::execution_plan::{BlockOp, ExecutionPlan, Stage};
use super::ir::{OpQueue, Operation};

/// Pipeline planner
pub struct Planner<T> {
    /// Block being built
    current_block: Vec<BlockOp<T>>,

    /// Completed stages
    stages: Vec<Stage<T>>,
}

impl<T> Planner<T> {
    /// Create a new planner
    pub fn new() -> Self {
        Planner {
            current_block: Vec::new(),
            stages: Vec::new(),
        }
    }

    /// Plan an operation queue into an execution plan
    #[instrument(name = "planner::plan", level = "trace", skip_all, fields(ops = queue.len()))]
    pub fn plan(queue: &OpQueue<T>) -> ExecutionPlan<T> {
        let mut planner = Planner::new();

        for op in queue.to_vec() {
            planner.process_op(op);
        }

        // Trailing block is pushed even when empty
        planner.flush_block();

        trace!(stages = planner.stages.len(), "compiled plan");
        ExecutionPlan {
            stages: planner.stages,
        }
    }

    /// Process a single operation
    fn process_op(&mut self, op: Operation<T>) {
        match op {
            Operation::Map(f) => self.current_block.push(BlockOp::Map(f)),
            Operation::Filter(f) => self.current_block.push(BlockOp::Filter(f)),
            Operation::Sort(cmp) => {
                self.flush_block();
                self.stages.push(Stage::Barrier(cmp));
            }
        }
    }

    /// Move the current block to the completed list
    fn flush_block(&mut self) {
        let block = std::mem::take(&mut self.current_block);
        self.stages.push(Stage::Block(block));
    }
}

impl<T> Default for Planner<T> {
    fn default() -> Self {
        Self::new()
    }
}
