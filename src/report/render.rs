// src/report/render.rs

use std::collections::HashMap;
use std::fmt::Write as _;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use super::snapshot::{GraphSnapshot, TaskSnapshot};

/// One line per task: status, name, kind and upstream tasks.
pub fn render_text(snapshot: &GraphSnapshot) -> String {
    let width = snapshot
        .tasks
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for task in &snapshot.tasks {
        let _ = write!(
            out,
            "{:<9} {:<width$} ({})",
            task.status.as_str(),
            task.name,
            task.kind,
        );
        if !task.upstream.is_empty() {
            let _ = write!(out, " after {}", task.upstream.join(", "));
        }
        out.push('\n');
    }
    out
}

/// Graphviz DOT rendering; nodes are filled with the status colour.
pub fn render_dot(snapshot: &GraphSnapshot) -> String {
    let mut graph: DiGraph<&TaskSnapshot, ()> = DiGraph::new();
    let nodes: HashMap<&str, NodeIndex> = snapshot
        .tasks
        .iter()
        .map(|task| (task.name.as_str(), graph.add_node(task)))
        .collect();

    for task in &snapshot.tasks {
        for dependent in &task.downstream {
            if let (Some(&from), Some(&to)) =
                (nodes.get(task.name.as_str()), nodes.get(dependent.as_str()))
            {
                graph.add_edge(from, to, ());
            }
        }
    }

    let dot = Dot::with_attr_getters(
        &graph,
        &[Config::NodeNoLabel, Config::EdgeNoLabel],
        &|_, _| String::new(),
        &|_, (_, task)| {
            format!(
                "label = {:?} style = filled fillcolor = {}",
                task.name,
                task.status.color()
            )
        },
    );
    format!("{dot:?}")
}
