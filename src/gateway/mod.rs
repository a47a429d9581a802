//! Tool Gateway Module
//!
//! The tool gateway is the external process that exposes geocoding and
//! routing tools to agents. Agents never talk to it directly: every call goes
//! through a capability-checked [`ToolBox`](crate::agent::ToolBox).
//!
//! ## Module Structure
//!
//! - [`types`]: Shared request/result/config types
//! - [`stdio`]: Child-process gateway speaking MCP over stdin/stdout (rmcp)
//! - [`mock`]: In-process gateway with canned Mapbox-shaped responses
//! - [`session`]: Scoped acquisition with guaranteed shutdown
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wayfarer::gateway::{GatewayConfig, GatewaySession, StdioGateway};
//!
//! let config = GatewayConfig::default().with_env("MAPBOX_ACCESS_TOKEN", token);
//! let gateway = StdioGateway::new(config)?; // fails fast on missing credential
//!
//! let result = GatewaySession::scoped(Arc::new(gateway), |gateway| async move {
//!     pipeline.kickoff(gateway).await
//! })
//! .await?;
//! ```

pub mod mock;
pub mod session;
pub mod stdio;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use mock::MockGateway;
pub use session::GatewaySession;
pub use stdio::StdioGateway;
pub use types::{
    ContentBlock, GatewayConfig, ToolCallRequest, ToolCallResult, ToolDefinition, ToolRef,
    MAPBOX_TOKEN_VAR,
};

/// Structured request/response access to an external tool provider.
///
/// Implementations must be safe to share across the pipeline run
/// (`Arc<dyn ToolGateway>`); a single instance belongs to one run.
#[async_trait]
pub trait ToolGateway: Send + Sync + std::fmt::Debug {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Start the gateway. Idempotent.
    async fn connect(&self) -> Result<()>;

    /// Stop the gateway and release its resources. Idempotent.
    async fn shutdown(&self) -> Result<()>;

    async fn is_connected(&self) -> bool;

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>>;

    /// Invoke a tool. Transport failures are returned as errors; a tool that
    /// ran but reported a problem yields `Ok` with `is_error = true`.
    async fn call_tool(&self, request: &ToolCallRequest) -> Result<ToolCallResult>;
}
