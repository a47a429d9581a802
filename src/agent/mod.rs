//! Agent Module
//!
//! Role-bound actors that turn a task description plus upstream context into
//! output text.
//!
//! ## Module Structure
//!
//! - [`definition`]: [`Agent`], its builder, request/response types, prompt rendering
//! - [`toolbox`]: Capability-checked, policy-wrapped gateway access per invocation
//! - [`behavior`]: The [`AgentBehavior`] trait and the closure adapter
//! - [`scripts`]: Deterministic travel behaviours (geocoding, route planning)
//!
//! ## Flow
//!
//! ```text
//! Runner ──► Agent::invoke(task_id, request, runtime)
//!                │
//!                ├── ToolBox (capabilities ∩ request) ──► CallPolicy ──► ToolGateway
//!                │
//!                └── AgentBehavior::perform(request, &toolbox) ──► output
//! ```

pub mod behavior;
pub mod definition;
pub mod scripts;
pub mod toolbox;

pub use behavior::{AgentBehavior, FnBehavior};
pub use definition::{Agent, AgentBuilder, AgentRequest, AgentResponse, CONTEXT_DIVIDER};
pub use scripts::{GeocodeScript, RouteScript, Stop};
pub use toolbox::{AgentRuntime, ToolBox, ToolCallRecord};
