//! Agent definition and invocation
//!
//! An [`Agent`] is immutable once built and shared by reference count: any
//! number of tasks may point at the same agent.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::agent::{AgentBehavior, AgentRuntime, FnBehavior, ToolBox, ToolCallRecord};
use crate::error::{Result, WayfarerError};
use crate::gateway::ToolRef;

/// Separator placed between upstream outputs in the context block
pub const CONTEXT_DIVIDER: &str = "\n\n----------\n\n";

/// Input handed to an agent for one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentRequest {
    pub description: String,
    pub expected_output: String,
    /// Upstream outputs in dependency-list order (possibly empty)
    pub context: Vec<String>,
}

impl AgentRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    /// Context outputs joined with [`CONTEXT_DIVIDER`].
    pub fn context_text(&self) -> String {
        self.context.join(CONTEXT_DIVIDER)
    }
}

/// Output of one agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    pub output: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// A named role with a goal, a backstory, and the tools it may call.
pub struct Agent {
    role: Arc<str>,
    goal: String,
    backstory: String,
    capabilities: FxHashSet<ToolRef>,
    verbose: bool,
    behavior: Arc<dyn AgentBehavior>,
}

impl Agent {
    pub fn builder(role: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(role)
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    pub fn capabilities(&self) -> &FxHashSet<ToolRef> {
        &self.capabilities
    }

    pub fn can_use(&self, tool: &str) -> bool {
        self.capabilities.contains(tool)
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn behavior_name(&self) -> &str {
        self.behavior.name()
    }

    /// Render the full task prompt for this agent.
    ///
    /// Layout: persona header, task, expected output, then the context block
    /// when there is upstream output.
    pub fn render_prompt(&self, request: &AgentRequest) -> String {
        let mut prompt = format!("You are {}.", self.role);
        if !self.backstory.is_empty() {
            prompt.push(' ');
            prompt.push_str(&self.backstory);
        }
        prompt.push_str(&format!("\nYour personal goal is: {}", self.goal));

        prompt.push_str(&format!("\n\nCurrent Task: {}", request.description));

        if !request.expected_output.is_empty() {
            prompt.push_str(&format!(
                "\n\nThis is the expected criteria for your final answer: {}",
                request.expected_output
            ));
        }

        if !request.context.is_empty() {
            prompt.push_str("\n\nThis is the context you're working with:\n");
            prompt.push_str(&request.context_text());
        }

        prompt
    }

    /// Run this agent on one task.
    ///
    /// # Errors
    ///
    /// - `AgentValidation` if the description is empty
    /// - `Capability` / `ToolInvocation` from tool calls
    /// - `Behavior` if the behaviour cannot produce output
    #[instrument(skip(self, request, runtime), fields(role = %self.role))]
    pub async fn invoke(
        &self,
        task_id: &str,
        request: &AgentRequest,
        runtime: &AgentRuntime,
    ) -> Result<AgentResponse> {
        if request.description.trim().is_empty() {
            return Err(WayfarerError::AgentValidation {
                reason: format!("agent '{}' received an empty task description", self.role),
            });
        }

        let prompt = self.render_prompt(request);
        if self.verbose {
            info!(behavior = self.behavior.name(), "{}", prompt);
        } else {
            debug!(behavior = self.behavior.name(), prompt_len = prompt.len(), "Invoking agent");
        }

        let tools = ToolBox::new(
            Arc::from(task_id),
            Arc::clone(&self.role),
            &self.capabilities,
            runtime,
        );
        let output = self.behavior.perform(request, &tools).await?;
        let tool_calls = tools.into_records();

        debug!(
            output_len = output.len(),
            tool_calls = tool_calls.len(),
            "Agent finished"
        );

        Ok(AgentResponse { output, tool_calls })
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tools: Vec<&str> = self.capabilities.iter().map(ToolRef::name).collect();
        tools.sort_unstable();

        f.debug_struct("Agent")
            .field("role", &self.role)
            .field("goal", &self.goal)
            .field("capabilities", &tools)
            .field("verbose", &self.verbose)
            .field("behavior", &self.behavior.name())
            .finish()
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    role: String,
    goal: String,
    backstory: String,
    capabilities: FxHashSet<ToolRef>,
    verbose: bool,
    behavior: Option<Arc<dyn AgentBehavior>>,
}

impl AgentBuilder {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            goal: String::new(),
            backstory: String::new(),
            capabilities: FxHashSet::default(),
            verbose: false,
            behavior: None,
        }
    }

    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    /// Persona text. Lines are trimmed and joined with single spaces.
    pub fn backstory(mut self, backstory: impl AsRef<str>) -> Self {
        self.backstory = backstory
            .as_ref()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        self
    }

    /// Bind a gateway tool to the agent.
    pub fn tool(mut self, name: &str) -> Self {
        self.capabilities.insert(ToolRef::new(name));
        self
    }

    pub fn tools<'t>(mut self, names: impl IntoIterator<Item = &'t str>) -> Self {
        self.capabilities.extend(names.into_iter().map(ToolRef::new));
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn behavior(mut self, behavior: impl AgentBehavior + 'static) -> Self {
        self.behavior = Some(Arc::new(behavior));
        self
    }

    /// Shorthand for a [`FnBehavior`].
    pub fn behavior_fn<F>(self, f: F) -> Self
    where
        F: Fn(&AgentRequest) -> Result<String> + Send + Sync + 'static,
    {
        self.behavior(FnBehavior::new(f))
    }

    /// Validate and build a shareable agent.
    ///
    /// # Errors
    ///
    /// `AgentValidation` if the role or goal is blank or no behaviour is set.
    pub fn build(self) -> Result<Arc<Agent>> {
        let role = self.role.trim();
        if role.is_empty() {
            return Err(WayfarerError::AgentValidation {
                reason: "agent role cannot be empty".to_string(),
            });
        }
        if self.goal.trim().is_empty() {
            return Err(WayfarerError::AgentValidation {
                reason: format!("agent '{}' has no goal", role),
            });
        }
        let behavior = self.behavior.ok_or_else(|| WayfarerError::AgentValidation {
            reason: format!("agent '{}' has no behavior", role),
        })?;

        Ok(Arc::new(Agent {
            role: Arc::from(role),
            goal: self.goal,
            backstory: self.backstory,
            capabilities: self.capabilities,
            verbose: self.verbose,
            behavior,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use pretty_assertions::assert_eq;

    fn echo_agent() -> Arc<Agent> {
        Agent::builder("Echo")
            .goal("Repeat the task")
            .backstory("  You repeat things.\n   Faithfully.  ")
            .tool("search_and_geocode_tool")
            .behavior_fn(|req| Ok(format!("{} | {}", req.description, req.context.len())))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_role_goal_and_behavior() {
        let no_role = Agent::builder("  ").goal("g").behavior_fn(|_| Ok(String::new()));
        assert_eq!(no_role.build().unwrap_err().code(), "WF-027");

        let no_goal = Agent::builder("Echo").behavior_fn(|_| Ok(String::new()));
        assert!(no_goal.build().unwrap_err().to_string().contains("has no goal"));

        let no_behavior = Agent::builder("Echo").goal("g");
        assert!(no_behavior
            .build()
            .unwrap_err()
            .to_string()
            .contains("has no behavior"));
    }

    #[test]
    fn test_backstory_is_normalized() {
        assert_eq!(echo_agent().backstory(), "You repeat things. Faithfully.");
    }

    #[test]
    fn test_capabilities() {
        let agent = echo_agent();
        assert!(agent.can_use("search_and_geocode_tool"));
        assert!(!agent.can_use("directions_tool"));
    }

    #[test]
    fn test_render_prompt_without_context() {
        let request = AgentRequest::new("Say hi").with_expected_output("A greeting");
        let prompt = echo_agent().render_prompt(&request);

        assert_eq!(
            prompt,
            "You are Echo. You repeat things. Faithfully.\n\
             Your personal goal is: Repeat the task\n\n\
             Current Task: Say hi\n\n\
             This is the expected criteria for your final answer: A greeting"
        );
    }

    #[test]
    fn test_render_prompt_joins_context_with_divider() {
        let request = AgentRequest::new("Combine")
            .with_context(vec!["first".to_string(), "second".to_string()]);
        let prompt = echo_agent().render_prompt(&request);

        assert!(prompt.ends_with(
            "This is the context you're working with:\nfirst\n\n----------\n\nsecond"
        ));
    }

    #[tokio::test]
    async fn test_invoke_rejects_empty_description() {
        let runtime = AgentRuntime::new(Arc::new(MockGateway::new()));
        let err = echo_agent()
            .invoke("t", &AgentRequest::new("   "), &runtime)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WF-027");
    }

    #[tokio::test]
    async fn test_invoke_returns_behavior_output() {
        let runtime = AgentRuntime::new(Arc::new(MockGateway::new()));
        let request = AgentRequest::new("hello").with_context(vec!["ctx".to_string()]);

        let response = echo_agent().invoke("t", &request, &runtime).await.unwrap();
        assert_eq!(response.output, "hello | 1");
        assert!(response.tool_calls.is_empty());
    }
}
