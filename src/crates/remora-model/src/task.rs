//! `AgentTask` — one planned agent execution (§3, graph builder's output node).

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::node::SourceNode;

/// Opaque handle to an agent "bundle" (system prompt, tool set, grammar,
/// max turns). The core never reads inside it — see §6, "Bundle handle
/// (consumed)".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleHandle(pub PathBuf);

impl BundleHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &std::path::Path {
        &self.0
    }
}

/// One planned agent execution over one [`SourceNode`].
///
/// Created by the graph builder (C3) and immutable thereafter; `upstream`
/// and `downstream` are populated once, in the single pass §4.3 describes,
/// and never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Equal to `target.id`.
    pub id: String,
    pub name: String,
    pub target: SourceNode,
    pub bundle_path: BundleHandle,
    /// Ids of tasks this task depends on.
    pub upstream: BTreeSet<String>,
    /// Ids of tasks that depend on this task; derived from `upstream`.
    pub downstream: BTreeSet<String>,
    /// Higher runs earlier within a batch; ties broken by id (§3).
    pub priority: i64,
}

impl AgentTask {
    pub fn new(target: SourceNode, bundle_path: BundleHandle, priority: i64) -> Self {
        let id = target.id.clone();
        let name = target.name.clone();
        Self {
            id,
            name,
            target,
            bundle_path,
            upstream: BTreeSet::new(),
            downstream: BTreeSet::new(),
            priority,
        }
    }

    /// Stable tie-break key used by the ready-set ordering in §4.3:
    /// descending priority, then ascending id.
    pub fn order_key(&self) -> (std::cmp::Reverse<i64>, &str) {
        (std::cmp::Reverse(self.priority), self.id.as_str())
    }
}
