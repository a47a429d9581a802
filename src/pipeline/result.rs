//! Pipeline results
//!
//! Outputs are kept in execution order with an index by task id.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::agent::ToolCallRecord;
use crate::task::TaskId;

/// Recorded output of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub task_id: TaskId,
    pub agent_role: String,
    pub output: Arc<str>,
    /// Upstream outputs the agent received, in dependency-list order
    pub context: Vec<Arc<str>>,
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Outputs of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: String,
    outputs: Vec<TaskOutput>,
    #[serde(skip)]
    index: FxHashMap<TaskId, usize>,
    #[serde(serialize_with = "as_millis")]
    pub total_duration: Duration,
}

impl PipelineResult {
    pub(crate) fn new(run_id: String) -> Self {
        Self {
            run_id,
            outputs: Vec::new(),
            index: FxHashMap::default(),
            total_duration: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, output: TaskOutput) {
        self.index.insert(output.task_id.clone(), self.outputs.len());
        self.outputs.push(output);
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskOutput> {
        self.index.get(task_id).map(|&i| &self.outputs[i])
    }

    /// Output text of `task_id`
    pub fn output(&self, task_id: &str) -> Option<&str> {
        self.get(task_id).map(|o| &*o.output)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.index.contains_key(task_id)
    }

    /// Outputs in execution order
    pub fn iter(&self) -> impl Iterator<Item = &TaskOutput> {
        self.outputs.iter()
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.task_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Output of the last task run (empty if nothing ran)
    pub fn final_output(&self) -> &str {
        self.outputs.last().map(|o| &*o.output).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(id: &str, text: &str) -> TaskOutput {
        TaskOutput {
            task_id: TaskId::new(id).unwrap(),
            agent_role: "Tester".to_string(),
            output: Arc::from(text),
            context: Vec::new(),
            tool_calls: Vec::new(),
            duration: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_record_and_lookup() {
        let mut result = PipelineResult::new("run-1".to_string());
        assert!(result.is_empty());
        assert_eq!(result.final_output(), "");

        result.record(output("geocode", "coords"));
        result.record(output("plan_route", "route"));

        assert_eq!(result.len(), 2);
        assert_eq!(result.output("geocode"), Some("coords"));
        assert!(result.contains("plan_route"));
        assert!(!result.contains("ghost"));
        assert_eq!(result.task_ids(), vec!["geocode", "plan_route"]);
        assert_eq!(result.final_output(), "route");
    }

    #[test]
    fn test_serializes_outputs_in_order() {
        let mut result = PipelineResult::new("run-1".to_string());
        result.record(output("a", "one"));
        result.record(output("b", "two"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["run_id"], "run-1");
        assert_eq!(json["outputs"][1]["task_id"], "b");
        assert_eq!(json["outputs"][0]["duration"], 3);
        assert!(json.get("index").is_none());
    }
}
