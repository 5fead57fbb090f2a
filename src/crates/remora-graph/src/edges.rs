//! Pluggable dependency-edge derivation (§4.3, §9).
//!
//! The only built-in rule today is intra-file: every function/class/method
//! task depends on the `file` task for its own file, if one exists. New
//! rules (e.g. call-graph edges) are added by implementing [`EdgeRule`] and
//! passing it alongside the built-in one — the executor and topological
//! sort never need to change.

use std::collections::HashMap;

use remora_model::{AgentTask, NODE_TYPE_FILE};

/// Produces the set of upstream task ids a given task depends on.
///
/// Implementations see the full task map so they can look up siblings
/// (e.g. "the file task for my file") without the graph builder knowing
/// anything about node-type semantics. `file_tasks_by_path` is a
/// precomputed `file_path -> file task id` index so a rule that only
/// cares about file-level siblings doesn't have to scan `tasks_by_id`.
pub trait EdgeRule: Send + Sync {
    fn upstream_for(
        &self,
        task: &AgentTask,
        tasks_by_id: &HashMap<String, AgentTask>,
        file_tasks_by_path: &HashMap<String, String>,
    ) -> Vec<String>;
}

/// Every non-file task depends on the `file` task covering its own
/// `file_path`, if the mapping produced one.
pub struct IntraFileEdgeRule;

impl EdgeRule for IntraFileEdgeRule {
    fn upstream_for(
        &self,
        task: &AgentTask,
        _tasks_by_id: &HashMap<String, AgentTask>,
        file_tasks_by_path: &HashMap<String, String>,
    ) -> Vec<String> {
        if task.target.node_type == NODE_TYPE_FILE {
            return Vec::new();
        }
        file_tasks_by_path
            .get(&task.target.file_path)
            .cloned()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_model::{BundleHandle, SourceNode, NODE_TYPE_FUNCTION};

    fn task(node_type: &str, name: &str, path: &str) -> AgentTask {
        let node = SourceNode::new(node_type, name, path, "", 1, 1);
        AgentTask::new(node, BundleHandle::new("b"), 0)
    }

    #[test]
    fn function_depends_on_its_file() {
        let file_task = task(NODE_TYPE_FILE, "a", "/a.rs");
        let fn_task = task(NODE_TYPE_FUNCTION, "foo", "/a.rs");
        let mut by_id = HashMap::new();
        by_id.insert(file_task.id.clone(), file_task.clone());
        by_id.insert(fn_task.id.clone(), fn_task.clone());
        let mut by_path = HashMap::new();
        by_path.insert(file_task.target.file_path.clone(), file_task.id.clone());

        let rule = IntraFileEdgeRule;
        let upstream = rule.upstream_for(&fn_task, &by_id, &by_path);
        assert_eq!(upstream, vec![file_task.id]);
        assert!(rule.upstream_for(&file_task, &by_id, &by_path).is_empty());
    }

    #[test]
    fn no_edge_when_no_file_task_exists() {
        let fn_task = task(NODE_TYPE_FUNCTION, "foo", "/a.rs");
        let mut by_id = HashMap::new();
        by_id.insert(fn_task.id.clone(), fn_task.clone());
        let by_path = HashMap::new();
        let rule = IntraFileEdgeRule;
        assert!(rule.upstream_for(&fn_task, &by_id, &by_path).is_empty());
    }
}
