//! Dependency-depth wave planning.
//!
//! Uses `petgraph` to model task dependencies as a directed graph. The plan
//! groups tasks by depth (longest dependency chain to a root), which is the
//! wave each task would run in if every task succeeded. It is used for dry
//! runs only; the live loop recomputes readiness after every wave.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use super::definition::WorkflowError;
use super::registry::TaskRegistry;

/// Group registered tasks into waves of task ids.
///
/// 1. Build a `DiGraph` with task ids as nodes and dependency -> dependent edges.
/// 2. Run `petgraph::algo::toposort` to verify acyclicity.
/// 3. Compute each node's depth (max dependency depth + 1).
/// 4. Group by depth; within a wave, order by descending priority then
///    registration order, matching the live launch order.
pub fn execution_plan(registry: &TaskRegistry) -> Result<Vec<Vec<String>>, WorkflowError> {
    if registry.is_empty() {
        return Ok(vec![]);
    }

    let mut graph = DiGraph::<&str, ()>::new();
    let node_indices: HashMap<&str, _> = registry
        .iter()
        .map(|task| (task.id(), graph.add_node(task.id())))
        .collect();

    for task in registry.iter() {
        let to = node_indices[task.id()];
        for dep in &task.spec().dependencies {
            let from = node_indices.get(dep.as_str()).ok_or_else(|| {
                WorkflowError::UnknownDependency {
                    task_id: task.id().to_string(),
                    dependency: dep.clone(),
                }
            })?;
            graph.add_edge(*from, to, ());
        }
    }

    let sorted = toposort(&graph, None).map_err(|cycle| {
        let node_id = graph[cycle.node_id()].to_string();
        WorkflowError::CycleDetected {
            path: format!("cycle involving task '{node_id}'"),
            task_id: node_id,
        }
    })?;

    let mut depths: HashMap<&str, usize> = HashMap::new();
    for node_idx in sorted {
        let id = graph[node_idx];
        let depth = registry
            .get(id)
            .map(|task| {
                task.spec()
                    .dependencies
                    .iter()
                    .map(|dep| depths.get(dep.as_str()).copied().unwrap_or(0) + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        depths.insert(id, depth);
    }

    let max_depth = depths.values().copied().max().unwrap_or(0);
    let mut waves: Vec<Vec<&str>> = vec![vec![]; max_depth + 1];
    for task in registry.iter() {
        waves[depths[task.id()]].push(task.id());
    }

    Ok(waves
        .into_iter()
        .map(|mut wave| {
            // Stable sort keeps registration order among equal priorities.
            wave.sort_by_key(|id| {
                std::cmp::Reverse(registry.get(id).map(|t| t.spec().priority).unwrap_or_default())
            });
            wave.into_iter().map(str::to_string).collect()
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::registry::Task;
    use taskweave_types::task::{Priority, TaskSpec};

    fn registry(specs: Vec<TaskSpec>) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for spec in specs {
            registry.insert(Task::new(spec));
        }
        registry
    }

    fn spec(id: &str, deps: Vec<&str>) -> TaskSpec {
        TaskSpec::new(id, id).depends_on(deps)
    }

    #[test]
    fn test_empty_registry_has_no_waves() {
        assert!(execution_plan(&TaskRegistry::new()).unwrap().is_empty());
    }

    #[test]
    fn test_no_dependencies_single_wave() {
        let reg = registry(vec![spec("a", vec![]), spec("b", vec![]), spec("c", vec![])]);
        let waves = execution_plan(&reg).unwrap();
        assert_eq!(waves, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_diamond_three_waves() {
        let reg = registry(vec![
            spec("a", vec![]),
            spec("b", vec!["a"]),
            spec("c", vec!["a"]),
            spec("d", vec!["b", "c"]),
        ]);
        let waves = execution_plan(&reg).unwrap();
        assert_eq!(waves, vec![vec!["a"], vec!["b", "c"], vec!["d"]]);
    }

    #[test]
    fn test_depth_uses_longest_chain() {
        let reg = registry(vec![
            spec("a", vec![]),
            spec("b", vec!["a"]),
            spec("c", vec!["a", "b"]),
        ]);
        let waves = execution_plan(&reg).unwrap();
        assert_eq!(waves.len(), 3);
        assert_eq!(waves[2], vec!["c"]);
    }

    #[test]
    fn test_wave_ordered_by_priority() {
        let reg = registry(vec![
            spec("low", vec![]).priority(Priority::Low),
            spec("crit", vec![]).priority(Priority::Critical),
            spec("norm", vec![]),
            spec("crit2", vec![]).priority(Priority::Critical),
        ]);
        let waves = execution_plan(&reg).unwrap();
        assert_eq!(waves[0], vec!["crit", "crit2", "norm", "low"]);
    }

    #[test]
    fn test_cycle_rejected() {
        let reg = registry(vec![spec("a", vec!["b"]), spec("b", vec!["a"])]);
        assert!(matches!(
            execution_plan(&reg),
            Err(WorkflowError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let reg = registry(vec![spec("a", vec!["ghost"])]);
        assert!(matches!(
            execution_plan(&reg),
            Err(WorkflowError::UnknownDependency { .. })
        ));
    }
}
