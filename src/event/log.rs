//! EventLog - append-only record of a pipeline run
//!
//! Ids are assigned in emission order, so the log doubles as the ground
//! truth for "A ran before B" assertions.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the pipeline log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Position in the log
    pub id: u64,
    /// Time since log creation (ms)
    pub timestamp_ms: u64,
    /// Event type and data
    pub kind: EventKind,
}

/// All event types.
///
/// Uses `Arc<str>` for task ids so events clone cheaply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // PIPELINE LEVEL
    // ═══════════════════════════════════════════
    PipelineStarted {
        run_id: String,
        task_count: usize,
    },
    PipelineCompleted {
        /// Output of the last task
        final_output: Arc<str>,
        total_duration_ms: u64,
    },
    PipelineFailed {
        error: String,
        failed_task: Option<Arc<str>>,
    },

    // ═══════════════════════════════════════════
    // TASK LEVEL
    // ═══════════════════════════════════════════
    TaskStarted {
        task_id: Arc<str>,
        agent_role: Arc<str>,
        /// Number of upstream outputs handed to the agent
        context_len: usize,
    },
    TaskCompleted {
        task_id: Arc<str>,
        output: Arc<str>,
        duration_ms: u64,
    },
    TaskFailed {
        task_id: Arc<str>,
        error: String,
        duration_ms: u64,
    },

    // ═══════════════════════════════════════════
    // TOOL LEVEL
    // ═══════════════════════════════════════════
    ToolCalled {
        task_id: Arc<str>,
        tool: String,
        arguments: Value,
    },
    ToolResponded {
        task_id: Arc<str>,
        tool: String,
        output_len: usize,
        is_error: bool,
        duration_ms: u64,
    },
    /// Tool call refused because the agent lacks the capability
    ToolDenied {
        task_id: Arc<str>,
        tool: String,
        agent_role: Arc<str>,
    },
}

impl EventKind {
    /// Owning task, for task and tool events
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskStarted { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. }
            | Self::ToolCalled { task_id, .. }
            | Self::ToolResponded { task_id, .. }
            | Self::ToolDenied { task_id, .. } => Some(task_id),
            Self::PipelineStarted { .. }
            | Self::PipelineCompleted { .. }
            | Self::PipelineFailed { .. } => None,
        }
    }

    pub fn is_pipeline_event(&self) -> bool {
        matches!(
            self,
            Self::PipelineStarted { .. }
                | Self::PipelineCompleted { .. }
                | Self::PipelineFailed { .. }
        )
    }
}

/// Shared, append-only event log.
///
/// Clones share storage: the runner and every tool box of a run append to
/// the same log.
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    origin: Instant,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            origin: Instant::now(),
        }
    }

    /// Append `kind` and return its id.
    ///
    /// The id is the event's position, taken under the write lock, so id
    /// order and append order never disagree.
    pub fn emit(&self, kind: EventKind) -> u64 {
        let timestamp_ms = self.origin.elapsed().as_millis() as u64;
        let mut events = self.events.write();
        let id = events.len() as u64;
        events.push(Event {
            id,
            timestamp_ms,
            kind,
        });
        id
    }

    /// Snapshot of every event so far
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Borrow the events under the read lock without cloning them.
    pub fn with_events<T>(&self, f: impl FnOnce(&[Event]) -> T) -> T {
        f(&self.events.read())
    }

    fn collect_where(&self, keep: impl Fn(&EventKind) -> bool) -> Vec<Event> {
        self.with_events(|events| events.iter().filter(|e| keep(&e.kind)).cloned().collect())
    }

    /// Events that belong to `task_id` (task and tool level)
    pub fn filter_task(&self, task_id: &str) -> Vec<Event> {
        self.collect_where(|kind| kind.task_id() == Some(task_id))
    }

    pub fn pipeline_events(&self) -> Vec<Event> {
        self.collect_where(EventKind::is_pipeline_event)
    }

    /// Task ids in the order their `TaskStarted` events were emitted
    pub fn started_order(&self) -> Vec<Arc<str>> {
        self.with_events(|events| {
            events
                .iter()
                .filter_map(|e| match &e.kind {
                    EventKind::TaskStarted { task_id, .. } => Some(Arc::clone(task_id)),
                    _ => None,
                })
                .collect()
        })
    }

    pub fn count_task(&self, task_id: &str) -> usize {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.task_id() == Some(task_id))
                .count()
        })
    }

    /// JSON array of all events
    pub fn to_json(&self) -> Value {
        self.with_events(|events| serde_json::to_value(events).unwrap_or(Value::Null))
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("events", &self.len())
            .finish_non_exhaustive()
    }
}
