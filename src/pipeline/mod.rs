//! Pipeline Module
//!
//! - [`builder`]: [`Pipeline`] / [`PipelineBuilder`], eager structural validation
//! - [`graph`]: dependency graph, cycle detection, declared-order check
//! - [`runner`]: sequential execution with context propagation
//! - [`result`]: per-task outputs and the final output
//!
//! Declaration order is execution order. The runner never reorders tasks;
//! it refuses an order in which a task precedes one of its dependencies.

pub mod builder;
pub mod graph;
pub mod result;
pub mod runner;

pub use builder::{Pipeline, PipelineBuilder};
pub use graph::{verify_order, DependencyGraph};
pub use result::{PipelineResult, TaskOutput};
pub use runner::Runner;
