// The #[error] attribute from thiserror uses struct fields via string interpolation,
// but Rust's unused_assignments lint doesn't recognize this.
#![allow(unused_assignments)]

//! Wayfarer Error Types with Error Codes
//!
//! Error code ranges:
//! - WF-000-019: Configuration errors (config file, credentials)
//! - WF-020-039: Pipeline definition errors (tasks, agents, DAG)
//! - WF-040-059: Execution errors
//! - WF-060-069: Capability errors
//! - WF-080-089: Tool gateway errors
//! - WF-090-099: IO/serialization errors
//!
//! Every variant also maps to an [`ErrorKind`], the coarse taxonomy callers
//! branch on (configuration vs tool invocation vs capability vs ordering).

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WayfarerError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credential or malformed pipeline definition. Raised at setup.
    Configuration,
    /// Gateway call failed, timed out, or the gateway could not be reached.
    ToolInvocation,
    /// Agent asked for a tool outside its capability set.
    Capability,
    /// Task sequence is not a valid topological order.
    DependencyNotReady,
    /// Any other runtime failure (behaviour errors, IO).
    Execution,
}

/// All error variants are part of the public API.
///
/// Implements both `thiserror::Error` for std error compatibility
/// and `miette::Diagnostic` for fancy terminal error display.
#[derive(Error, Debug, Diagnostic)]
pub enum WayfarerError {
    // ═══════════════════════════════════════════
    // CONFIGURATION ERRORS (000-019)
    // ═══════════════════════════════════════════
    #[error("[WF-001] Configuration error: {reason}")]
    #[diagnostic(code(wayfarer::config_error))]
    ConfigError { reason: String },

    #[error("[WF-002] Invalid configuration: {message}")]
    #[diagnostic(code(wayfarer::invalid_config))]
    InvalidConfig { message: String },

    #[error("[WF-003] Missing credential '{var}' for gateway '{gateway}'")]
    #[diagnostic(
        code(wayfarer::missing_credential),
        help("Set the variable in your environment or .env file")
    )]
    MissingCredential { var: String, gateway: String },

    // ═══════════════════════════════════════════
    // PIPELINE DEFINITION ERRORS (020-039)
    // ═══════════════════════════════════════════
    #[error("[WF-020] Invalid task ID '{id}': {reason}")]
    #[diagnostic(code(wayfarer::invalid_task_id))]
    InvalidTaskId { id: String, reason: String },

    #[error("[WF-021] Duplicate task '{task_id}'")]
    #[diagnostic(code(wayfarer::duplicate_task))]
    DuplicateTask { task_id: String },

    #[error("[WF-022] Task '{task_id}' has an empty description")]
    #[diagnostic(code(wayfarer::empty_description))]
    EmptyDescription { task_id: String },

    #[error("[WF-023] Missing dependency: task '{task_id}' depends on unknown '{dep_id}'")]
    #[diagnostic(code(wayfarer::missing_dependency))]
    MissingDependency { task_id: String, dep_id: String },

    #[error("[WF-024] Cycle detected in task graph: {cycle}")]
    #[diagnostic(code(wayfarer::cycle_detected))]
    CycleDetected { cycle: String },

    #[error("[WF-025] Task '{task_id}' is assigned to agent '{role}' which is not registered")]
    #[diagnostic(code(wayfarer::unregistered_agent))]
    UnregisteredAgent { task_id: String, role: String },

    #[error("[WF-026] Duplicate agent role '{role}'")]
    #[diagnostic(code(wayfarer::duplicate_agent))]
    DuplicateAgent { role: String },

    #[error("[WF-027] Agent validation failed: {reason}")]
    #[diagnostic(code(wayfarer::agent_validation))]
    AgentValidation { reason: String },

    // ═══════════════════════════════════════════
    // EXECUTION ERRORS (040-059)
    // ═══════════════════════════════════════════
    #[error(
        "[WF-040] Task '{task_id}' depends on '{dependency}' which has not run yet (declared order is not a valid dependency order)"
    )]
    #[diagnostic(code(wayfarer::dependency_not_ready))]
    DependencyNotReady { task_id: String, dependency: String },

    #[error("[WF-041] Task '{task_id}' failed: {source}")]
    #[diagnostic(code(wayfarer::task_failed))]
    TaskFailed {
        task_id: String,
        #[source]
        source: Box<WayfarerError>,
    },

    #[error("[WF-042] Agent '{role}' could not complete the task: {reason}")]
    #[diagnostic(code(wayfarer::behavior_error))]
    Behavior { role: String, reason: String },

    // ═══════════════════════════════════════════
    // CAPABILITY ERRORS (060-069)
    // ═══════════════════════════════════════════
    #[error("[WF-060] Agent '{role}' is not permitted to call tool '{tool}'")]
    #[diagnostic(code(wayfarer::capability))]
    Capability { role: String, tool: String },

    // ═══════════════════════════════════════════
    // GATEWAY ERRORS (080-089)
    // ═══════════════════════════════════════════
    #[error("[WF-080] Failed to start tool gateway '{name}': {reason}")]
    #[diagnostic(code(wayfarer::gateway_start))]
    GatewayStart { name: String, reason: String },

    #[error("[WF-081] Tool gateway '{name}' is not connected")]
    #[diagnostic(code(wayfarer::gateway_not_connected))]
    GatewayNotConnected { name: String },

    #[error("[WF-082] Tool gateway '{name}' protocol error: {reason}")]
    #[diagnostic(code(wayfarer::gateway_protocol))]
    GatewayProtocol { name: String, reason: String },

    #[error("[WF-083] Tool call '{tool}' failed: {reason}")]
    #[diagnostic(code(wayfarer::tool_call))]
    ToolCall { tool: String, reason: String },

    #[error("[WF-084] Tool call '{tool}' timed out after {timeout_ms}ms")]
    #[diagnostic(code(wayfarer::tool_timeout))]
    ToolTimeout { tool: String, timeout_ms: u64 },

    #[error("[WF-085] Tool '{tool}' invocation failed after {attempts} attempt(s): {reason}")]
    #[diagnostic(code(wayfarer::tool_invocation))]
    ToolInvocation {
        tool: String,
        attempts: u32,
        reason: String,
    },

    // ═══════════════════════════════════════════
    // IO ERRORS (090-099)
    // ═══════════════════════════════════════════
    #[error("[WF-090] IO error: {0}")]
    #[diagnostic(code(wayfarer::io_error))]
    IoError(#[from] std::io::Error),

    #[error("[WF-091] JSON error: {0}")]
    #[diagnostic(code(wayfarer::json_error))]
    JsonError(#[from] serde_json::Error),
}

impl WayfarerError {
    /// Get the error code (e.g., "WF-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError { .. } => "WF-001",
            Self::InvalidConfig { .. } => "WF-002",
            Self::MissingCredential { .. } => "WF-003",
            Self::InvalidTaskId { .. } => "WF-020",
            Self::DuplicateTask { .. } => "WF-021",
            Self::EmptyDescription { .. } => "WF-022",
            Self::MissingDependency { .. } => "WF-023",
            Self::CycleDetected { .. } => "WF-024",
            Self::UnregisteredAgent { .. } => "WF-025",
            Self::DuplicateAgent { .. } => "WF-026",
            Self::AgentValidation { .. } => "WF-027",
            Self::DependencyNotReady { .. } => "WF-040",
            Self::TaskFailed { .. } => "WF-041",
            Self::Behavior { .. } => "WF-042",
            Self::Capability { .. } => "WF-060",
            Self::GatewayStart { .. } => "WF-080",
            Self::GatewayNotConnected { .. } => "WF-081",
            Self::GatewayProtocol { .. } => "WF-082",
            Self::ToolCall { .. } => "WF-083",
            Self::ToolTimeout { .. } => "WF-084",
            Self::ToolInvocation { .. } => "WF-085",
            Self::IoError(_) => "WF-090",
            Self::JsonError(_) => "WF-091",
        }
    }

    /// Classify the error. `TaskFailed` reports the kind of its cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfig { .. }
            | Self::MissingCredential { .. }
            | Self::InvalidTaskId { .. }
            | Self::DuplicateTask { .. }
            | Self::EmptyDescription { .. }
            | Self::MissingDependency { .. }
            | Self::CycleDetected { .. }
            | Self::UnregisteredAgent { .. }
            | Self::DuplicateAgent { .. }
            | Self::AgentValidation { .. } => ErrorKind::Configuration,
            Self::DependencyNotReady { .. } => ErrorKind::DependencyNotReady,
            Self::Capability { .. } => ErrorKind::Capability,
            Self::GatewayStart { .. }
            | Self::GatewayNotConnected { .. }
            | Self::GatewayProtocol { .. }
            | Self::ToolCall { .. }
            | Self::ToolTimeout { .. }
            | Self::ToolInvocation { .. } => ErrorKind::ToolInvocation,
            Self::TaskFailed { source, .. } => source.kind(),
            Self::Behavior { .. } | Self::IoError(_) | Self::JsonError(_) => ErrorKind::Execution,
        }
    }

    /// Strip `TaskFailed` wrappers and return the underlying error.
    pub fn root(&self) -> &WayfarerError {
        match self {
            Self::TaskFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if error is transient (the gateway call layer may retry it)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ToolCall { .. } | Self::ToolTimeout { .. } | Self::GatewayNotConnected { .. }
        )
    }
}

impl FixSuggestion for WayfarerError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            WayfarerError::ConfigError { .. } => {
                Some("Check ~/.config/wayfarer/config.toml for syntax errors")
            }
            WayfarerError::InvalidConfig { .. } => Some("Check configuration value is valid"),
            WayfarerError::MissingCredential { .. } => {
                Some("Set MAPBOX_ACCESS_TOKEN in your environment or .env file")
            }
            WayfarerError::InvalidTaskId { .. } => {
                Some("Task IDs must be snake_case: lowercase letters, digits, underscores")
            }
            WayfarerError::DuplicateTask { .. } => Some("Give every task a unique ID"),
            WayfarerError::EmptyDescription { .. } => Some("Describe what the task should do"),
            WayfarerError::MissingDependency { .. } => {
                Some("Add the missing task or fix the dependency reference")
            }
            WayfarerError::CycleDetected { .. } => {
                Some("Remove circular dependencies between tasks")
            }
            WayfarerError::UnregisteredAgent { .. } => {
                Some("Register the agent with the pipeline builder before adding its tasks")
            }
            WayfarerError::DuplicateAgent { .. } => Some("Give every agent a unique role"),
            WayfarerError::AgentValidation { .. } => {
                Some("Check the agent has a role, a goal, and a non-empty task description")
            }
            WayfarerError::DependencyNotReady { .. } => {
                Some("Declare tasks after the tasks they depend on")
            }
            WayfarerError::TaskFailed { source, .. } => source.fix_suggestion(),
            WayfarerError::Behavior { .. } => Some("Check the task description and tool output"),
            WayfarerError::Capability { .. } => {
                Some("Add the tool to the agent's capability set")
            }
            WayfarerError::GatewayStart { .. } => {
                Some("Check the gateway command and args (is npx installed?)")
            }
            WayfarerError::GatewayNotConnected { .. } => {
                Some("Connect the gateway before running the pipeline")
            }
            WayfarerError::GatewayProtocol { .. } => Some("Check tool gateway compatibility"),
            WayfarerError::ToolCall { .. } => Some("Check tool parameters and gateway logs"),
            WayfarerError::ToolTimeout { .. } => {
                Some("Increase retry.call_timeout_ms or check network connectivity")
            }
            WayfarerError::ToolInvocation { .. } => {
                Some("Check tool parameters, credentials, and gateway logs")
            }
            WayfarerError::IoError(_) => Some("Check file path and permissions"),
            WayfarerError::JsonError(_) => Some("Check JSON syntax"),
        }
    }
}
