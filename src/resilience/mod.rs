//! Resilience patterns for gateway calls
//!
//! - [`retry`]: Retry with exponential backoff, plus the per-call timeout
//!   policy applied to every tool call an agent makes.
//!
//! The pipeline itself never retries; this is the only retry layer.

pub mod retry;

pub use retry::{CallPolicy, Exhausted, RetryConfig, RetryPolicy};
