//! Event Module - audit trail for pipeline runs
//!
//! Key types:
//! - `Event`: Envelope with id + timestamp + kind
//! - `EventKind`: pipeline, task, and tool level variants
//! - `EventLog`: Thread-safe, append-only log shared by the runner and tool boxes

mod log;

pub use log::{Event, EventKind, EventLog};
