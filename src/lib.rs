//! Wayfarer - sequential multi-agent pipeline with an MCP tool gateway
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  agent/     Agent, AgentBehavior, ToolBox, travel scripts    │
//! │  task       Task, TaskId                                     │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  pipeline/  Builder, dependency graph, sequential Runner     │
//! │  travel     Two-agent San Francisco trip plan                │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  gateway/    ToolGateway trait, stdio (rmcp), mock, session  │
//! │  resilience/ Per-call timeout + retry with backoff           │
//! │  event/      Append-only event log                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`agent`] | Role/goal/capabilities, prompt rendering, capability-checked tool calls |
//! | [`task`] | Static task configuration with ordered upstream dependencies |
//! | [`pipeline`] | Eager validation, declared-order execution, context propagation |
//! | [`gateway`] | Structured tool calls over MCP stdio, or canned in-process |
//! | [`resilience`] | Timeout and retry policy for every gateway call |
//! | [`event`] | Audit trail of pipeline, task, and tool events |
//! | [`travel`] | The concrete geocode → plan_route pipeline |
//! | [`config`] | TOML config + explicit env overlay |
//! | [`error`] | Error types with codes and fix suggestions |

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL
// ═══════════════════════════════════════════════════════════════
pub mod agent;
pub mod task;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER
// ═══════════════════════════════════════════════════════════════
pub mod pipeline;
pub mod travel;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER
// ═══════════════════════════════════════════════════════════════
pub mod event;
pub mod gateway;
pub mod resilience;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - Error handling, configuration
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

pub use error::{ErrorKind, FixSuggestion, Result, WayfarerError};

pub use config::{mask_api_key, RetrySettings, WayfarerConfig};

pub use agent::{
    Agent, AgentBehavior, AgentBuilder, AgentRequest, AgentResponse, AgentRuntime, FnBehavior,
    GeocodeScript, RouteScript, ToolBox, ToolCallRecord,
};
pub use task::{validate_task_id, Task, TaskBuilder, TaskId};

pub use pipeline::{Pipeline, PipelineBuilder, PipelineResult, Runner, TaskOutput};
pub use travel::{plan_trip, travel_pipeline, GatewayMode};

pub use event::{Event, EventKind, EventLog};
pub use gateway::{
    ContentBlock, GatewayConfig, GatewaySession, MockGateway, StdioGateway, ToolCallRequest,
    ToolCallResult, ToolDefinition, ToolGateway, ToolRef,
};
pub use resilience::{CallPolicy, RetryConfig, RetryPolicy};
