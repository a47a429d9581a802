//! Pipeline definition
//!
//! A [`Pipeline`] is a validated, ordered list of tasks plus the agents they
//! use. All structural checks happen in [`PipelineBuilder::build`], so a
//! built pipeline can only fail at run time because of agent or tool errors.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::agent::Agent;
use crate::error::{Result, WayfarerError};
use crate::gateway::ToolGateway;
use crate::pipeline::graph::{verify_order, DependencyGraph};
use crate::pipeline::{PipelineResult, Runner};
use crate::resilience::CallPolicy;
use crate::task::Task;

/// Validated agents + tasks, in execution order.
#[derive(Debug, Clone)]
pub struct Pipeline {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Arc<Task>>,
    verbose: bool,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Runner over this pipeline's gateway, with default call policy.
    pub fn runner(&self, gateway: Arc<dyn ToolGateway>) -> Runner {
        Runner::new(gateway).verbose(self.verbose)
    }

    /// Run every task in order against a connected gateway.
    pub async fn kickoff(&self, gateway: Arc<dyn ToolGateway>) -> Result<PipelineResult> {
        self.runner(gateway).run(&self.tasks).await
    }

    /// Like [`kickoff`](Self::kickoff) with an explicit call policy.
    pub async fn kickoff_with(
        &self,
        gateway: Arc<dyn ToolGateway>,
        policy: CallPolicy,
    ) -> Result<PipelineResult> {
        self.runner(gateway)
            .with_call_policy(policy)
            .run(&self.tasks)
            .await
    }
}

/// Collects agents and tasks, validating on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    verbose: bool,
}

impl PipelineBuilder {
    /// Register an agent. Tasks may only use registered agents.
    pub fn agent(mut self, agent: &Arc<Agent>) -> Self {
        self.agents.push(Arc::clone(agent));
        self
    }

    /// Append a task. Declaration order is execution order.
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Print progress lines while running.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate and build.
    ///
    /// Checks, in order:
    /// 1. at least one task
    /// 2. agent roles unique, task ids unique
    /// 3. every dependency names a task (`MissingDependency`)
    /// 4. no cycles (`CycleDetected`)
    /// 5. every dependency declared before its dependent (`DependencyNotReady`)
    /// 6. every task's agent is registered (`UnregisteredAgent`)
    pub fn build(self) -> Result<Pipeline> {
        if self.tasks.is_empty() {
            return Err(WayfarerError::InvalidConfig {
                message: "pipeline has no tasks".to_string(),
            });
        }

        let mut roles = FxHashSet::default();
        for agent in &self.agents {
            if !roles.insert(agent.role()) {
                return Err(WayfarerError::DuplicateAgent {
                    role: agent.role().to_string(),
                });
            }
        }

        let mut ids = FxHashSet::default();
        for task in &self.tasks {
            if !ids.insert(task.id().as_str()) {
                return Err(WayfarerError::DuplicateTask {
                    task_id: task.id().to_string(),
                });
            }
        }

        let tasks: Vec<Arc<Task>> = self.tasks.into_iter().map(Arc::new).collect();

        let graph = DependencyGraph::from_tasks(&tasks);
        graph.validate_references()?;
        graph.detect_cycles()?;
        verify_order(&tasks)?;

        for task in &tasks {
            let registered = self.agents.iter().any(|a| Arc::ptr_eq(a, task.agent()));
            if !registered {
                return Err(WayfarerError::UnregisteredAgent {
                    task_id: task.id().to_string(),
                    role: task.agent().role().to_string(),
                });
            }
        }

        debug!(
            agents = self.agents.len(),
            tasks = tasks.len(),
            "Pipeline validated"
        );

        Ok(Pipeline {
            agents: self.agents,
            tasks,
            verbose: self.verbose,
        })
    }
}
