//! Pipeline planning and execution
//!
//! This module provides the deferred execution engine behind
//! [`LazyCollection`](crate::LazyCollection):
//!
//! 1. **IR**: chained requests are recorded as a persistent queue of operations
//! 2. **Planner**: fuses contiguous map/filter runs into blocks, isolates sorts as barriers
//! 3. **Executor**: runs the stages against a data source, stopping early at the limit
//!
//! ## Architecture
//!
//! ```text
//! coll.map(f).filter(g).sort(c).map(h).take(3)
//!     ↓
//! OpQueue: [Map(f), Filter(g), Sort(c), Map(h)]   limit = 3
//!     ↓
//! ExecutionPlan: [Block([f, g]), Barrier(c), Block([h])]
//!     ↓
//! Executor: one pass for [f, g], one sort, then [h] until 3 elements exist
//! ```
//!
//! ## Benefits
//!
//! - **Fewer allocations**: one result sequence per block instead of one per operation
//! - **Bounded work**: a limited final block never reads past the elements it needs
//! - **Plan once per call**: plans are rebuilt for each terminal call and never cached

pub mod execution_plan;
pub mod executor;
pub mod ir;
pub mod planner;

pub use execution_plan::{BlockOp, ExecutionPlan, Stage};
pub use executor::{BlockIter, ExecutionResult, ExecutionStats, Executor};
pub use ir::{CompareFn, FilterFn, MapFn, OpQueue, Operation};
pub use planner::Planner;
