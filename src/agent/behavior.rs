//! Agent behaviours
//!
//! An agent's behaviour turns a request (task description + context) into
//! output text, calling tools through the [`ToolBox`] it is given.

use async_trait::async_trait;

use crate::agent::{AgentRequest, ToolBox};
use crate::error::Result;

/// Pluggable agent logic.
#[async_trait]
pub trait AgentBehavior: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn perform(&self, request: &AgentRequest, tools: &ToolBox<'_>) -> Result<String>;
}

/// Behaviour backed by a plain function; no tool access.
///
/// ```rust,ignore
/// let echo = FnBehavior::new(|req: &AgentRequest| Ok(req.description.clone()));
/// ```
pub struct FnBehavior<F> {
    f: F,
}

impl<F> FnBehavior<F>
where
    F: Fn(&AgentRequest) -> Result<String> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> AgentBehavior for FnBehavior<F>
where
    F: Fn(&AgentRequest) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    async fn perform(&self, request: &AgentRequest, _tools: &ToolBox<'_>) -> Result<String> {
        (self.f)(request)
    }
}
