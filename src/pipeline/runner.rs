//! Sequential pipeline runner with context propagation
//!
//! Tasks run one at a time in the declared order. Before anything runs the
//! order itself is verified, so a bad order fails without touching an agent.
//! Each task receives the recorded outputs of its dependencies, in the order
//! the dependencies were listed. The first failing task aborts the run.

use std::sync::Arc;
use std::time::Instant;

use colored::Colorize;
use rustc_hash::FxHashMap;
use tracing::{info, instrument, warn};

use crate::agent::{AgentRequest, AgentRuntime};
use crate::error::{Result, WayfarerError};
use crate::event::{EventKind, EventLog};
use crate::gateway::ToolGateway;
use crate::pipeline::graph::verify_order;
use crate::pipeline::{PipelineResult, TaskOutput};
use crate::resilience::CallPolicy;
use crate::task::Task;

/// Executes task lists against one gateway.
#[derive(Debug, Clone)]
pub struct Runner {
    runtime: AgentRuntime,
    verbose: bool,
}

impl Runner {
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        Self {
            runtime: AgentRuntime::new(gateway),
            verbose: false,
        }
    }

    pub fn with_call_policy(mut self, policy: CallPolicy) -> Self {
        self.runtime.policy = policy;
        self
    }

    /// Share an existing log (e.g. to inspect events after a failed run).
    pub fn with_event_log(mut self, events: EventLog) -> Self {
        self.runtime.events = events;
        self
    }

    /// Print progress lines to stdout.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn event_log(&self) -> &EventLog {
        &self.runtime.events
    }

    /// Run `tasks` in order.
    ///
    /// # Errors
    ///
    /// - `DependencyNotReady` / `DuplicateTask` if the order is invalid
    ///   (no agent is invoked)
    /// - `TaskFailed` wrapping the first task error
    #[instrument(skip_all, fields(tasks = tasks.len()))]
    pub async fn run(&self, tasks: &[Arc<Task>]) -> Result<PipelineResult> {
        let events = &self.runtime.events;

        if let Err(e) = verify_order(tasks) {
            events.emit(EventKind::PipelineFailed {
                error: e.to_string(),
                failed_task: None,
            });
            return Err(e);
        }

        let run_id = format!("run-{}", uuid::Uuid::new_v4());
        let started = Instant::now();
        events.emit(EventKind::PipelineStarted {
            run_id: run_id.clone(),
            task_count: tasks.len(),
        });
        info!(run_id = %run_id, "Pipeline started");

        if self.verbose {
            println!(
                "{} Running pipeline with {} tasks...\n",
                "→".cyan(),
                tasks.len()
            );
        }

        let mut result = PipelineResult::new(run_id);
        let mut outputs: FxHashMap<Arc<str>, Arc<str>> = FxHashMap::default();

        for (index, task) in tasks.iter().enumerate() {
            let task_id = task.id().as_arc();
            let agent = task.agent();

            // verify_order guarantees every dependency already has an output
            let context: Vec<Arc<str>> = task
                .dependencies()
                .iter()
                .filter_map(|dep| outputs.get(dep.as_str()).cloned())
                .collect();

            events.emit(EventKind::TaskStarted {
                task_id: Arc::clone(&task_id),
                agent_role: Arc::from(agent.role()),
                context_len: context.len(),
            });

            if self.verbose {
                println!(
                    "  {} {} {} {}",
                    "[⟳]".yellow(),
                    &*task_id,
                    agent.role().bold(),
                    "running...".dimmed()
                );
            }

            let request = AgentRequest::new(task.description())
                .with_expected_output(task.expected_output())
                .with_context(context.iter().map(|c| c.to_string()).collect());

            let task_start = Instant::now();
            let invoked = agent.invoke(&task_id, &request, &self.runtime).await;
            let duration = task_start.elapsed();

            let response = match invoked {
                Ok(response) => response,
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "Task failed");
                    events.emit(EventKind::TaskFailed {
                        task_id: Arc::clone(&task_id),
                        error: e.to_string(),
                        duration_ms: duration.as_millis() as u64,
                    });
                    events.emit(EventKind::PipelineFailed {
                        error: e.to_string(),
                        failed_task: Some(Arc::clone(&task_id)),
                    });
                    if self.verbose {
                        println!("  {} {} {}", "[✗]".red(), &*task_id, "failed".red());
                        println!("      {} {}", "Error:".red(), e);
                    }
                    return Err(WayfarerError::TaskFailed {
                        task_id: task_id.to_string(),
                        source: Box::new(e),
                    });
                }
            };

            let output: Arc<str> = Arc::from(response.output);
            events.emit(EventKind::TaskCompleted {
                task_id: Arc::clone(&task_id),
                output: Arc::clone(&output),
                duration_ms: duration.as_millis() as u64,
            });
            info!(
                task_id = %task_id,
                duration_ms = duration.as_millis() as u64,
                tool_calls = response.tool_calls.len(),
                "Task completed"
            );

            if self.verbose {
                println!(
                    "  {} {} {} {}",
                    format!("[{}/{}]", index + 1, tasks.len()).green(),
                    &*task_id,
                    "✓".green(),
                    format!("({:.1}s)", duration.as_secs_f32()).dimmed()
                );
            }

            outputs.insert(Arc::clone(&task_id), Arc::clone(&output));
            result.record(TaskOutput {
                task_id: task.id().clone(),
                agent_role: agent.role().to_string(),
                output,
                context,
                tool_calls: response.tool_calls,
                duration,
            });
        }

        result.total_duration = started.elapsed();
        events.emit(EventKind::PipelineCompleted {
            final_output: Arc::from(result.final_output()),
            total_duration_ms: result.total_duration.as_millis() as u64,
        });
        info!(
            total_ms = result.total_duration.as_millis() as u64,
            "Pipeline completed"
        );

        if self.verbose {
            println!("\n{} Done!\n", "✓".green());
        }

        Ok(result)
    }
}
