//! Task definition
//!
//! A [`Task`] is static configuration: what to do, who does it, and which
//! earlier tasks feed it. It is executed only by the pipeline runner.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use smallvec::SmallVec;

use crate::agent::Agent;
use crate::error::{Result, WayfarerError};

/// Stack-allocated deps: most tasks have 0-4 dependencies
pub type DepVec = SmallVec<[TaskId; 4]>;

const TASK_ID_RULE: &str =
    "must start with lowercase letter (a-z), then lowercase letters, digits, or underscores";

/// Validate task ID is snake_case: `[a-z][a-z0-9_]*`
pub fn validate_task_id(id: &str) -> Result<()> {
    let Some(&first) = id.as_bytes().first() else {
        return Err(WayfarerError::InvalidTaskId {
            id: id.to_string(),
            reason: "cannot be empty".into(),
        });
    };

    let rest_ok = id.as_bytes()[1..]
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');

    if !first.is_ascii_lowercase() || !rest_ok {
        return Err(WayfarerError::InvalidTaskId {
            id: id.to_string(),
            reason: TASK_ID_RULE.into(),
        });
    }

    Ok(())
}

/// Task identity. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(Arc<str>);

impl TaskId {
    /// Parse a task id, enforcing snake_case.
    pub fn new(id: &str) -> Result<Self> {
        validate_task_id(id)?;
        Ok(Self(Arc::from(id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_arc(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for TaskId {
    type Error = WayfarerError;

    fn try_from(id: &str) -> Result<Self> {
        Self::new(id)
    }
}

/// A unit of work bound to one agent.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    description: String,
    expected_output: String,
    agent: Arc<Agent>,
    context: DepVec,
}

impl Task {
    pub fn builder(id: &str) -> TaskBuilder {
        TaskBuilder::new(id)
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    /// Upstream tasks whose outputs form this task's context, in order
    pub fn dependencies(&self) -> &[TaskId] {
        &self.context
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.context.iter().any(|dep| dep.as_str() == id)
    }
}

/// Builder for [`Task`].
#[derive(Debug)]
pub struct TaskBuilder {
    id: String,
    description: String,
    expected_output: String,
    agent: Option<Arc<Agent>>,
    context: Vec<String>,
}

impl TaskBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            description: String::new(),
            expected_output: String::new(),
            agent: None,
            context: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    pub fn agent(mut self, agent: &Arc<Agent>) -> Self {
        self.agent = Some(Arc::clone(agent));
        self
    }

    /// Add an upstream task. Order of calls is the context order.
    pub fn context(mut self, dependency: &str) -> Self {
        self.context.push(dependency.to_string());
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// - `InvalidTaskId` for a non snake_case id or dependency
    /// - `EmptyDescription` if the description is blank
    /// - `InvalidConfig` if no agent is assigned or a dependency is listed twice
    /// - `CycleDetected` if the task depends on itself
    pub fn build(self) -> Result<Task> {
        let id = TaskId::new(&self.id)?;

        if self.description.trim().is_empty() {
            return Err(WayfarerError::EmptyDescription {
                task_id: self.id,
            });
        }

        let agent = self.agent.ok_or_else(|| WayfarerError::InvalidConfig {
            message: format!("task '{}' has no agent assigned", self.id),
        })?;

        let mut context = DepVec::new();
        for dep in &self.context {
            let dep_id = TaskId::new(dep)?;
            if dep_id == id {
                return Err(WayfarerError::CycleDetected {
                    cycle: format!("{} → {}", id, id),
                });
            }
            if context.contains(&dep_id) {
                return Err(WayfarerError::InvalidConfig {
                    message: format!("task '{}' lists dependency '{}' twice", id, dep_id),
                });
            }
            context.push(dep_id);
        }

        Ok(Task {
            id,
            description: self.description,
            expected_output: self.expected_output,
            agent,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Arc<Agent> {
        Agent::builder("Tester")
            .goal("Test things")
            .behavior_fn(|_| Ok("ok".to_string()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_validate_task_id_accepts_snake_case() {
        for id in ["geocode", "plan_route", "step2", "a", "a_b_c_123"] {
            assert!(validate_task_id(id).is_ok(), "{} should be valid", id);
        }
    }

    #[test]
    fn test_validate_task_id_rejects_bad_ids() {
        for id in ["", "Geocode", "plan-route", "2step", "_private", "plan route", "café"] {
            let err = validate_task_id(id).unwrap_err();
            assert_eq!(err.code(), "WF-020", "{:?} should be invalid", id);
        }
    }

    #[test]
    fn test_build_task_with_context() {
        let agent = agent();
        let task = Task::builder("plan_route")
            .description("Plan a route")
            .expected_output("A route")
            .agent(&agent)
            .context("geocode")
            .context("weather")
            .build()
            .unwrap();

        assert_eq!(task.id().as_str(), "plan_route");
        let deps: Vec<&str> = task.dependencies().iter().map(TaskId::as_str).collect();
        assert_eq!(deps, vec!["geocode", "weather"]);
        assert!(task.depends_on("geocode"));
        assert!(Arc::ptr_eq(task.agent(), &agent));
    }

    #[test]
    fn test_agent_shared_by_tasks() {
        let agent = agent();
        let a = Task::builder("a").description("A").agent(&agent).build().unwrap();
        let b = Task::builder("b").description("B").agent(&agent).build().unwrap();
        assert!(Arc::ptr_eq(a.agent(), b.agent()));
        assert_eq!(Arc::strong_count(&agent), 3);
    }

    #[test]
    fn test_build_rejects_empty_description() {
        let err = Task::builder("a").description("  ").agent(&agent()).build().unwrap_err();
        assert_eq!(err.code(), "WF-022");
    }

    #[test]
    fn test_build_rejects_missing_agent() {
        let err = Task::builder("a").description("A").build().unwrap_err();
        assert_eq!(err.code(), "WF-002");
    }

    #[test]
    fn test_build_rejects_self_dependency() {
        let err = Task::builder("a")
            .description("A")
            .agent(&agent())
            .context("a")
            .build()
            .unwrap_err();
        match err {
            WayfarerError::CycleDetected { cycle } => assert_eq!(cycle, "a → a"),
            other => panic!("Expected CycleDetected, got: {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_duplicate_dependency() {
        let err = Task::builder("b")
            .description("B")
            .agent(&agent())
            .context("a")
            .context("a")
            .build()
            .unwrap_err();
        assert_eq!(err.code(), "WF-002");
    }
}
