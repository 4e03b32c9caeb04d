//! lazyseq: deferred-evaluation collection pipelines
//!
//! Chain map/filter/sort/take requests without running anything; terminal
//! calls compile the chain into fused passes and stop reading the source as
//! soon as a limited result is complete.

pub mod collection;
pub mod error;
pub mod pipeline;
pub mod source;

pub use collection::{LazyCollection, PipelineSource};
pub use error::{BoxError, Error, Result};
pub use pipeline::{
    ExecutionPlan, ExecutionResult, ExecutionStats, Executor, OpQueue, Operation, Planner, Stage,
};
pub use source::{
    ColumnType, Cursor, DataSource, IterSource, QueryResultSource, ResultHandle, Row, VecSource,
};
