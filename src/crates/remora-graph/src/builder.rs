//! Maps discovered [`SourceNode`]s to [`AgentTask`]s and wires their
//! dependency edges (§4.3).

use std::collections::HashMap;

use remora_model::{AgentTask, BundleHandle, SourceNode};
use tracing::debug;

use crate::edges::EdgeRule;
use crate::error::Result;
use crate::graph::Graph;

/// A node-type → bundle mapping, with optional per-node-type priority.
/// A `SourceNode` whose type has no entry is dropped silently (§4.3).
#[derive(Debug, Clone, Default)]
pub struct BundleMapping {
    bundles: HashMap<String, BundleHandle>,
    priorities: HashMap<String, i64>,
}

impl BundleMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, node_type: impl Into<String>, bundle: BundleHandle) -> Self {
        self.bundles.insert(node_type.into(), bundle);
        self
    }

    pub fn priority(mut self, node_type: impl Into<String>, priority: i64) -> Self {
        self.priorities.insert(node_type.into(), priority);
        self
    }

    fn bundle_for(&self, node_type: &str) -> Option<&BundleHandle> {
        self.bundles.get(node_type)
    }

    fn priority_for(&self, node_type: &str) -> i64 {
        self.priorities.get(node_type).copied().unwrap_or(0)
    }
}

/// Build a fully-ordered [`Graph`] from discovered nodes.
///
/// Unmapped nodes are dropped. Edge rules run after every mapped task
/// exists, so a rule may reference any other task's id; `downstream` is
/// then derived from the union of all rules' `upstream` output in one
/// O(V+E) pass, per §4.3.
pub fn build(nodes: &[SourceNode], mapping: &BundleMapping, edge_rules: &[Box<dyn EdgeRule>]) -> Result<Graph> {
    let mut tasks: HashMap<String, AgentTask> = HashMap::new();
    for node in nodes {
        let Some(bundle) = mapping.bundle_for(&node.node_type) else {
            continue;
        };
        let priority = mapping.priority_for(&node.node_type);
        let task = AgentTask::new(node.clone(), bundle.clone(), priority);
        tasks.insert(task.id.clone(), task);
    }
    debug!(mapped = tasks.len(), discovered = nodes.len(), "mapped nodes to tasks");

    // Compute upstream edges against a read-only snapshot so edge rules
    // can see every task, then apply them and derive downstream in one
    // further pass. `file_tasks_by_path` lets a rule look up "the file
    // task for this path" in O(1) instead of scanning every task.
    let snapshot = tasks.clone();
    let file_tasks_by_path: HashMap<String, String> = snapshot
        .values()
        .filter(|task| task.target.node_type == remora_model::NODE_TYPE_FILE)
        .map(|task| (task.target.file_path.clone(), task.id.clone()))
        .collect();
    let mut upstream_by_id: HashMap<String, Vec<String>> = HashMap::new();
    for task in snapshot.values() {
        let mut upstream = Vec::new();
        for rule in edge_rules {
            upstream.extend(rule.upstream_for(task, &snapshot, &file_tasks_by_path));
        }
        upstream_by_id.insert(task.id.clone(), upstream);
    }
    for (id, upstream) in &upstream_by_id {
        if let Some(task) = tasks.get_mut(id) {
            task.upstream.extend(upstream.iter().cloned());
        }
    }
    for (id, upstream) in upstream_by_id {
        for up in upstream {
            if let Some(up_task) = tasks.get_mut(&up) {
                up_task.downstream.insert(id.clone());
            }
        }
    }

    Graph::from_tasks(tasks)
}
