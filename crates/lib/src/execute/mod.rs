//! Target ordering and execution.
//!
//! [`TargetGraph`] validates the `depends` declarations of a project and
//! linearizes them. The [`Executor`] implementations decide which part of the
//! graph runs for a request.

mod executor;
mod graph;

pub use executor::{DefaultExecutor, Executor, ExecutorKind, IgnoreDependenciesExecutor, SingleCheckExecutor};
pub use graph::TargetGraph;
