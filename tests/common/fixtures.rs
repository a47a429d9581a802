//! Test fixtures and helpers

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use wayfarer::agent::Agent;
use wayfarer::resilience::{CallPolicy, RetryConfig};
use wayfarer::task::Task;

/// Shared record of agent invocations: `(task description, context)`
pub type InvocationLog = Arc<Mutex<Vec<(String, Vec<String>)>>>;

pub fn invocation_log() -> InvocationLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Agent that records every invocation and answers `out:<description>`.
pub fn recording_agent(role: &str, log: &InvocationLog) -> Arc<Agent> {
    let log = Arc::clone(log);
    Agent::builder(role)
        .goal("Record what it is asked to do")
        .behavior_fn(move |req| {
            log.lock()
                .push((req.description.clone(), req.context.clone()));
            Ok(format!("out:{}", req.description))
        })
        .build()
        .unwrap()
}

/// Task whose description equals its id.
pub fn task(id: &str, agent: &Arc<Agent>, deps: &[&str]) -> Task {
    deps.iter()
        .fold(Task::builder(id).description(id).agent(agent), |b, d| {
            b.context(d)
        })
        .build()
        .unwrap()
}

pub fn shared(tasks: Vec<Task>) -> Vec<Arc<Task>> {
    tasks.into_iter().map(Arc::new).collect()
}

/// Call policy with tiny backoff so retry tests stay fast
pub fn fast_policy(max_retries: u32) -> CallPolicy {
    CallPolicy::new(
        RetryConfig::none()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(0.0),
        Duration::from_secs(5),
    )
}
