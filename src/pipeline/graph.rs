//! DependencyGraph - task → upstream edges for a task list
//!
//! - Arc<str> ids, FxHashMap adjacency, SmallVec edge lists (0-4 deps typical)
//! - Reference check (every dependency names a task in the list)
//! - Cycle detection using the DFS three-colour algorithm
//! - Declared-order check (every dependency appears earlier)

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::{Result, WayfarerError};
use crate::task::Task;

type EdgeVec = SmallVec<[Arc<str>; 4]>;

/// Dependency edges of a task list, in declaration order.
pub struct DependencyGraph {
    /// task_id -> task_ids it depends on
    dependencies: FxHashMap<Arc<str>, EdgeVec>,
    /// All task IDs (declaration order)
    task_ids: Vec<Arc<str>>,
}

impl DependencyGraph {
    pub fn from_tasks(tasks: &[Arc<Task>]) -> Self {
        let mut dependencies: FxHashMap<Arc<str>, EdgeVec> =
            FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default());
        let mut task_ids = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = task.id().as_arc();
            task_ids.push(Arc::clone(&id));
            dependencies.insert(
                id,
                task.dependencies().iter().map(|d| d.as_arc()).collect(),
            );
        }

        Self {
            dependencies,
            task_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.dependencies.contains_key(task_id)
    }

    /// Direct dependencies of `task_id` (empty if unknown)
    pub fn dependencies(&self, task_id: &str) -> &[Arc<str>] {
        self.dependencies
            .get(task_id)
            .map(|deps| deps.as_slice())
            .unwrap_or(&[])
    }

    /// Every dependency must name a task in the graph.
    pub fn validate_references(&self) -> Result<()> {
        for task_id in &self.task_ids {
            for dep in self.dependencies(task_id) {
                if !self.contains(dep) {
                    return Err(WayfarerError::MissingDependency {
                        task_id: task_id.to_string(),
                        dep_id: dep.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Detect cycles using three-colour DFS.
    ///
    /// White = unvisited, Gray = on the current path, Black = done.
    /// The reported path follows dependency edges, e.g. `a → b → a`.
    pub fn detect_cycles(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn dfs(
            node: &Arc<str>,
            graph: &FxHashMap<Arc<str>, EdgeVec>,
            colors: &mut FxHashMap<Arc<str>, Color>,
            path: &mut Vec<Arc<str>>,
        ) -> std::result::Result<(), String> {
            colors.insert(Arc::clone(node), Color::Gray);
            path.push(Arc::clone(node));

            for next in graph.get(node).into_iter().flatten() {
                match colors.get(next).copied() {
                    Some(Color::Gray) => {
                        let start = path.iter().position(|x| x == next).unwrap_or(0);
                        let cycle: Vec<&str> = path[start..].iter().map(|s| s.as_ref()).collect();
                        return Err(format!("{} → {}", cycle.join(" → "), next));
                    }
                    Some(Color::White) => dfs(next, graph, colors, path)?,
                    // Black: finished. None: dangling reference, reported elsewhere
                    Some(Color::Black) | None => {}
                }
            }

            path.pop();
            colors.insert(Arc::clone(node), Color::Black);
            Ok(())
        }

        let mut colors: FxHashMap<Arc<str>, Color> = self
            .task_ids
            .iter()
            .map(|id| (Arc::clone(id), Color::White))
            .collect();
        let mut path = Vec::new();

        for task_id in &self.task_ids {
            if colors.get(task_id) == Some(&Color::White) {
                dfs(task_id, &self.dependencies, &mut colors, &mut path)
                    .map_err(|cycle| WayfarerError::CycleDetected { cycle })?;
            }
        }

        Ok(())
    }
}

/// Check that `tasks` is a valid execution order as declared.
///
/// Each dependency must appear earlier in the slice. A dependency that
/// appears later, or not at all, is reported as `DependencyNotReady` for the
/// first offending task. Repeated ids are rejected as `DuplicateTask`.
pub fn verify_order(tasks: &[Arc<Task>]) -> Result<()> {
    let mut seen: FxHashSet<&str> =
        FxHashSet::with_capacity_and_hasher(tasks.len(), Default::default());

    for task in tasks {
        if let Some(dep) = task
            .dependencies()
            .iter()
            .find(|dep| !seen.contains(dep.as_str()))
        {
            return Err(WayfarerError::DependencyNotReady {
                task_id: task.id().to_string(),
                dependency: dep.to_string(),
            });
        }

        if !seen.insert(task.id().as_str()) {
            return Err(WayfarerError::DuplicateTask {
                task_id: task.id().to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;

    fn tasks(shape: &[(&str, &[&str])]) -> Vec<Arc<Task>> {
        let agent = Agent::builder("Tester")
            .goal("Test")
            .behavior_fn(|_| Ok(String::new()))
            .build()
            .unwrap();

        shape.iter()
            .map(|(id, deps)| {
                let builder = deps.iter().fold(
                    Task::builder(id).description("do it").agent(&agent),
                    |b, dep| b.context(dep),
                );
                Arc::new(builder.build().unwrap())
            })
            .collect()
    }

    #[test]
    fn test_dependencies_lookup() {
        let graph = DependencyGraph::from_tasks(&tasks(&[("a", &[]), ("b", &["a"])]));
        assert_eq!(graph.len(), 2);
        assert!(graph.dependencies("a").is_empty());
        assert_eq!(graph.dependencies("b")[0].as_ref(), "a");
        assert!(graph.dependencies("zzz").is_empty());
    }

    #[test]
    fn test_missing_reference() {
        let graph = DependencyGraph::from_tasks(&tasks(&[("a", &["ghost"])]));
        match graph.validate_references().unwrap_err() {
            WayfarerError::MissingDependency { task_id, dep_id } => {
                assert_eq!(task_id, "a");
                assert_eq!(dep_id, "ghost");
            }
            other => panic!("Expected MissingDependency, got: {:?}", other),
        }
    }

    #[test]
    fn test_no_cycle_in_diamond() {
        let graph = DependencyGraph::from_tasks(&tasks(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]));
        assert!(graph.detect_cycles().is_ok());
    }

    #[test]
    fn test_cycle_path_reported() {
        let graph = DependencyGraph::from_tasks(&tasks(&[
            ("a", &["c"]),
            ("b", &["a"]),
            ("c", &["b"]),
        ]));
        match graph.detect_cycles().unwrap_err() {
            WayfarerError::CycleDetected { cycle } => assert_eq!(cycle, "a → c → b → a"),
            other => panic!("Expected CycleDetected, got: {:?}", other),
        }
    }

    #[test]
    fn test_verify_order_accepts_topological_order() {
        assert!(verify_order(&tasks(&[("a", &[]), ("b", &["a"]), ("c", &["a", "b"])])).is_ok());
        assert!(verify_order(&[]).is_ok());
    }

    #[test]
    fn test_verify_order_rejects_dependency_declared_later() {
        match verify_order(&tasks(&[("b", &["a"]), ("a", &[])])).unwrap_err() {
            WayfarerError::DependencyNotReady {
                task_id,
                dependency,
            } => {
                assert_eq!(task_id, "b");
                assert_eq!(dependency, "a");
            }
            other => panic!("Expected DependencyNotReady, got: {:?}", other),
        }
    }

    #[test]
    fn test_verify_order_rejects_absent_dependency() {
        let err = verify_order(&tasks(&[("a", &["ghost"])])).unwrap_err();
        assert_eq!(err.code(), "WF-040");
    }

    #[test]
    fn test_verify_order_rejects_duplicates() {
        let err = verify_order(&tasks(&[("a", &[]), ("a", &[])])).unwrap_err();
        assert_eq!(err.code(), "WF-021");
    }
}
