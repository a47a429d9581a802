//! Capability-checked tool access for one agent invocation.
//!
//! A [`ToolBox`] is created per task run. It refuses tools outside the
//! agent's capability set before the gateway sees the request, applies the
//! call policy (timeout + retry) to everything else, and records each call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, WayfarerError};
use crate::event::{EventKind, EventLog};
use crate::gateway::{ToolCallRequest, ToolCallResult, ToolGateway, ToolRef};
use crate::resilience::CallPolicy;

/// Shared services an agent needs while running a task.
#[derive(Debug, Clone)]
pub struct AgentRuntime {
    pub gateway: Arc<dyn ToolGateway>,
    pub policy: CallPolicy,
    pub events: EventLog,
}

impl AgentRuntime {
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        Self {
            gateway,
            policy: CallPolicy::default(),
            events: EventLog::new(),
        }
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }
}

/// One completed tool call, as seen by the agent.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: Value,
    pub output: String,
    pub is_error: bool,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Tool access handed to an [`AgentBehavior`](super::AgentBehavior).
pub struct ToolBox<'a> {
    task_id: Arc<str>,
    role: Arc<str>,
    capabilities: &'a FxHashSet<ToolRef>,
    runtime: &'a AgentRuntime,
    records: Mutex<Vec<ToolCallRecord>>,
}

impl<'a> ToolBox<'a> {
    pub fn new(
        task_id: Arc<str>,
        role: Arc<str>,
        capabilities: &'a FxHashSet<ToolRef>,
        runtime: &'a AgentRuntime,
    ) -> Self {
        Self {
            task_id,
            role,
            capabilities,
            runtime,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Role of the agent this tool box belongs to
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn can_use(&self, tool: &str) -> bool {
        self.capabilities.contains(tool)
    }

    /// Call `tool` with `arguments`.
    ///
    /// # Errors
    ///
    /// - `Capability` if the agent is not bound to `tool` (gateway untouched)
    /// - `ToolInvocation` if the call fails after retries, times out on every
    ///   attempt, or the tool reports `is_error`
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<ToolCallResult> {
        if !self.can_use(tool) {
            warn!(task_id = %self.task_id, role = %self.role, tool, "Tool call denied");
            self.runtime.events.emit(EventKind::ToolDenied {
                task_id: Arc::clone(&self.task_id),
                tool: tool.to_string(),
                agent_role: Arc::clone(&self.role),
            });
            return Err(WayfarerError::Capability {
                role: self.role.to_string(),
                tool: tool.to_string(),
            });
        }

        self.runtime.events.emit(EventKind::ToolCalled {
            task_id: Arc::clone(&self.task_id),
            tool: tool.to_string(),
            arguments: arguments.clone(),
        });
        debug!(task_id = %self.task_id, tool, %arguments, "Calling tool");

        let request = ToolCallRequest::new(tool).with_arguments(arguments);
        let gateway = Arc::clone(&self.runtime.gateway);
        let start = Instant::now();

        let outcome = self
            .runtime
            .policy
            .call(tool, || {
                let gateway = Arc::clone(&gateway);
                let request = request.clone();
                async move { gateway.call_tool(&request).await }
            })
            .await;
        let duration = start.elapsed();

        let (output, is_error) = match &outcome {
            Ok(result) => (result.text(), result.is_error),
            Err(e) => (e.to_string(), true),
        };

        self.runtime.events.emit(EventKind::ToolResponded {
            task_id: Arc::clone(&self.task_id),
            tool: tool.to_string(),
            output_len: output.len(),
            is_error,
            duration_ms: duration.as_millis() as u64,
        });

        self.records.lock().push(ToolCallRecord {
            tool: tool.to_string(),
            arguments: request.arguments,
            output: output.clone(),
            is_error,
            duration,
        });

        let result = outcome?;
        if result.is_error {
            warn!(task_id = %self.task_id, tool, error = %output, "Tool reported an error");
            return Err(WayfarerError::ToolInvocation {
                tool: tool.to_string(),
                attempts: 1,
                reason: output,
            });
        }

        debug!(task_id = %self.task_id, tool, output_len = output.len(), "Tool responded");
        Ok(result)
    }

    /// Call `tool` and parse its first JSON text block.
    pub async fn call_json(&self, tool: &str, arguments: Value) -> Result<Value> {
        let result = self.call(tool, arguments).await?;
        result
            .first_json()
            .ok_or_else(|| WayfarerError::ToolInvocation {
                tool: tool.to_string(),
                attempts: 1,
                reason: "response did not contain JSON".to_string(),
            })
    }

    /// Calls made so far (in order).
    pub fn records(&self) -> Vec<ToolCallRecord> {
        self.records.lock().clone()
    }

    pub fn into_records(self) -> Vec<ToolCallRecord> {
        self.records.into_inner()
    }
}

impl std::fmt::Debug for ToolBox<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBox")
            .field("task_id", &self.task_id)
            .field("role", &self.role)
            .field("capabilities", &self.capabilities)
            .field("calls", &self.records.lock().len())
            .finish()
    }
}
