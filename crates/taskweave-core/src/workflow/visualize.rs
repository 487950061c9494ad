//! Graph rendering for external tools.
//!
//! Pure functions over the registry and current run state: one node per task
//! labelled with its name and status, one edge per dependency. Usable before
//! any execution (every task reads as `pending`).

use std::collections::HashMap;
use std::fmt::Write as _;
use std::str::FromStr;

use taskweave_types::task::TaskStatus;

use super::registry::TaskRegistry;
use super::state::RunState;

/// Output format for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphFormat {
    #[default]
    Mermaid,
    Dot,
}

impl FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mermaid" => Ok(GraphFormat::Mermaid),
            "dot" | "graphviz" => Ok(GraphFormat::Dot),
            other => Err(format!("invalid graph format: '{other}'")),
        }
    }
}

const STATUSES: [TaskStatus; 6] = [
    TaskStatus::Pending,
    TaskStatus::Running,
    TaskStatus::Completed,
    TaskStatus::Failed,
    TaskStatus::Skipped,
    TaskStatus::Cancelled,
];

fn fill_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "#eeeeee",
        TaskStatus::Running => "#fff3b0",
        TaskStatus::Completed => "#c8f7c5",
        TaskStatus::Failed => "#f7c5c5",
        TaskStatus::Skipped => "#e0d4f7",
        TaskStatus::Cancelled => "#d6d6d6",
    }
}

pub fn render(registry: &TaskRegistry, state: &RunState, format: GraphFormat) -> String {
    match format {
        GraphFormat::Mermaid => render_mermaid(registry, state),
        GraphFormat::Dot => render_dot(registry, state),
    }
}

fn mermaid_label(text: &str) -> String {
    text.replace('"', "#quot;")
}

/// Node label: the task id, its name when that differs, then the status.
fn mermaid_node_label(id: &str, name: &str, status: TaskStatus) -> String {
    if name == id {
        format!("{}<br/>{status}", mermaid_label(id))
    } else {
        format!("{}<br/>{}<br/>{status}", mermaid_label(id), mermaid_label(name))
    }
}

/// Mermaid `graph TD` flowchart with one `classDef` per status.
///
/// Nodes are named `t0`, `t1`, ... by registration position. Task ids only
/// appear inside labels, so ids that differ by punctuation stay distinct and
/// Mermaid keywords such as `end` are safe.
pub fn render_mermaid(registry: &TaskRegistry, state: &RunState) -> String {
    let node_ids: HashMap<&str, String> = registry
        .ids()
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), format!("t{i}")))
        .collect();

    let mut out = String::from("graph TD\n");

    for task in registry.iter() {
        let status = state.status(task.id());
        let _ = writeln!(
            out,
            "    {}[\"{}\"]:::{}",
            node_ids[task.id()],
            mermaid_node_label(task.id(), task.spec().display_name(), status),
            status
        );
    }

    for task in registry.iter() {
        for dep in &task.spec().dependencies {
            // Unknown dependencies are left to validate().
            if let Some(from) = node_ids.get(dep.as_str()) {
                let _ = writeln!(out, "    {} --> {}", from, node_ids[task.id()]);
            }
        }
    }

    for status in STATUSES {
        let _ = writeln!(out, "    classDef {} fill:{},stroke:#555", status, fill_color(status));
    }

    out
}

fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Graphviz DOT digraph with status-colored nodes.
pub fn render_dot(registry: &TaskRegistry, state: &RunState) -> String {
    let mut out = String::from("digraph workflow {\n");
    out.push_str("    rankdir=TB;\n");
    out.push_str("    node [shape=box, style=\"rounded,filled\"];\n");

    for task in registry.iter() {
        let status = state.status(task.id());
        let _ = writeln!(
            out,
            "    \"{}\" [label=\"{}\\n{}\", fillcolor=\"{}\"];",
            dot_escape(task.id()),
            dot_escape(task.spec().display_name()),
            status,
            fill_color(status)
        );
    }

    for task in registry.iter() {
        for dep in &task.spec().dependencies {
            let _ = writeln!(out, "    \"{}\" -> \"{}\";", dot_escape(dep), dot_escape(task.id()));
        }
    }

    out.push_str("}\n");
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::registry::Task;
    use taskweave_types::task::{TaskResult, TaskSpec};

    fn setup() -> (TaskRegistry, RunState) {
        let mut registry = TaskRegistry::new();
        registry.insert(Task::new(TaskSpec::new("fetch-feed", "Fetch \"feed\"")));
        registry.insert(Task::new(TaskSpec::new("summarize", "Summarize").depends_on(["fetch-feed"])));
        (registry, RunState::new())
    }

    #[test]
    fn mermaid_before_execution_shows_pending() {
        let (registry, state) = setup();
        let text = render_mermaid(&registry, &state);
        assert!(text.starts_with("graph TD\n"));
        assert!(text.contains("t0[\"fetch-feed<br/>Fetch #quot;feed#quot;<br/>pending\"]:::pending"));
        assert!(text.contains("t1[\"summarize<br/>Summarize<br/>pending\"]:::pending"));
        assert!(text.contains("t0 --> t1"));
        assert!(text.contains("classDef failed fill:#f7c5c5"));
    }

    #[test]
    fn mermaid_reflects_current_status() {
        let (registry, state) = setup();
        state.record(TaskResult::synthetic("fetch-feed", TaskStatus::Failed, "x"));
        let text = render(&registry, &state, GraphFormat::Mermaid);
        assert!(text.contains("<br/>failed\"]:::failed"));
    }

    fn node_ids(text: &str) -> Vec<&str> {
        text.lines()
            .filter_map(|line| line.trim().split_once("[\""))
            .map(|(id, _)| id)
            .collect()
    }

    #[test]
    fn mermaid_ids_stay_distinct_for_similar_task_ids() {
        let mut registry = TaskRegistry::new();
        registry.insert(Task::new(TaskSpec::new("load-a", "load-a")));
        registry.insert(Task::new(TaskSpec::new("load_a", "load_a")));
        registry.insert(Task::new(TaskSpec::new("sink", "sink").depends_on(["load-a"])));
        let text = render_mermaid(&registry, &RunState::new());

        let ids = node_ids(&text);
        assert_eq!(ids, vec!["t0", "t1", "t2"]);
        assert!(text.contains("t0[\"load-a<br/>pending\"]"));
        assert!(text.contains("t1[\"load_a<br/>pending\"]"));
        assert!(text.contains("t0 --> t2"));
        assert!(!text.contains("t1 --> t2"));
    }

    #[test]
    fn mermaid_keyword_task_id_is_only_a_label() {
        let mut registry = TaskRegistry::new();
        registry.insert(Task::new(TaskSpec::new("start", "start")));
        registry.insert(Task::new(TaskSpec::new("end", "end").depends_on(["start"])));
        let text = render_mermaid(&registry, &RunState::new());

        assert_eq!(node_ids(&text), vec!["t0", "t1"]);
        assert!(text.contains("t1[\"end<br/>pending\"]:::pending"));
        assert!(text.contains("t0 --> t1"));
        assert!(!text.lines().any(|line| line.trim().starts_with("end")));
    }

    #[test]
    fn dot_has_nodes_and_edges() {
        let (registry, state) = setup();
        let text = render(&registry, &state, GraphFormat::Dot);
        assert!(text.starts_with("digraph workflow {"));
        assert!(text.contains("\"fetch-feed\" [label=\"Fetch \\\"feed\\\"\\npending\""));
        assert!(text.contains("\"fetch-feed\" -> \"summarize\";"));
        assert!(text.trim_end().ends_with('}'));
    }

    #[test]
    fn format_from_str() {
        assert_eq!("DOT".parse::<GraphFormat>().unwrap(), GraphFormat::Dot);
        assert_eq!("mermaid".parse::<GraphFormat>().unwrap(), GraphFormat::Mermaid);
        assert!("svg".parse::<GraphFormat>().is_err());
    }
}
