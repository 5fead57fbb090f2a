//! The on-disk `state.json` shape (§6, "Checkpoint on-disk layout") and
//! its conversion to/from [`ExecutorState`].

use std::collections::{HashMap, HashSet};

use remora_model::{AgentTask, ExecutorState, ResultSummary, TaskStatus};
use serde::{Deserialize, Serialize};

/// Serialised form of [`ExecutorState`], matching §6's exact field set:
/// `graph_id`, `tasks`, `status`, `results`, and explicit `pending`,
/// `failed`, `skipped` arrays. `extra` absorbs any field this version
/// doesn't recognise so round-tripping through an older/newer build
/// preserves it ("unknown fields MUST be preserved on round-trip").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointedState {
    pub graph_id: String,
    pub tasks: HashMap<String, AgentTask>,
    pub status: HashMap<String, TaskStatus>,
    pub results: HashMap<String, ResultSummary>,
    pub pending: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl From<&ExecutorState> for CheckpointedState {
    /// A task `Running` when saved has no "running" slot in the
    /// persisted schema, so it folds into `pending` — restoring it
    /// means "resume by treating every pending/running task as
    /// pending" (§4.7).
    fn from(state: &ExecutorState) -> Self {
        let mut pending = Vec::new();
        for (id, status) in &state.status {
            if matches!(status, TaskStatus::Pending | TaskStatus::Running) {
                pending.push(id.clone());
            }
        }
        pending.sort();
        let mut failed: Vec<String> = state.failed.iter().cloned().collect();
        failed.sort();
        let mut skipped: Vec<String> = state.skipped.iter().cloned().collect();
        skipped.sort();

        Self {
            graph_id: state.graph_id.clone(),
            tasks: state.tasks.clone(),
            status: state.status.clone(),
            results: state.results.clone(),
            pending,
            failed,
            skipped,
            extra: serde_json::Map::new(),
        }
    }
}

impl From<CheckpointedState> for ExecutorState {
    fn from(checkpoint: CheckpointedState) -> Self {
        let mut status: HashMap<String, TaskStatus> =
            checkpoint.tasks.keys().map(|id| (id.clone(), TaskStatus::Pending)).collect();
        for id in &checkpoint.pending {
            status.insert(id.clone(), TaskStatus::Pending);
        }
        for id in &checkpoint.failed {
            status.insert(id.clone(), TaskStatus::Failed);
        }
        for id in &checkpoint.skipped {
            status.insert(id.clone(), TaskStatus::Skipped);
        }
        for id in checkpoint.results.keys() {
            status.insert(id.clone(), TaskStatus::Completed);
        }

        ExecutorState {
            graph_id: checkpoint.graph_id,
            tasks: checkpoint.tasks,
            status,
            results: checkpoint.results,
            failed: checkpoint.failed.into_iter().collect::<HashSet<_>>(),
            skipped: checkpoint.skipped.into_iter().collect::<HashSet<_>>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_model::{BundleHandle, SourceNode};

    fn sample_state() -> ExecutorState {
        let node = SourceNode::new("function", "foo", "/a.rs", "", 1, 1);
        let task = AgentTask::new(node.clone(), BundleHandle::new("b"), 0);
        let mut tasks = HashMap::new();
        tasks.insert(node.id.clone(), task);
        let mut state = ExecutorState::new("g1", tasks);
        state.transition(&node.id, TaskStatus::Running).unwrap();
        state
    }

    #[test]
    fn running_task_round_trips_as_pending() {
        let state = sample_state();
        let checkpointed = CheckpointedState::from(&state);
        assert_eq!(checkpointed.pending.len(), 1);
        let restored: ExecutorState = checkpointed.into();
        let id = restored.tasks.keys().next().unwrap();
        assert_eq!(restored.status_of(id), Some(TaskStatus::Pending));
    }

    #[test]
    fn upstream_downstream_sets_survive_round_trip() {
        let node_a = SourceNode::new("file", "a", "/a.rs", "", 1, 1);
        let node_b = SourceNode::new("function", "foo", "/a.rs", "", 1, 1);
        let mut task_a = AgentTask::new(node_a.clone(), BundleHandle::new("b"), 0);
        let mut task_b = AgentTask::new(node_b.clone(), BundleHandle::new("b"), 0);
        task_a.downstream.insert(task_b.id.clone());
        task_b.upstream.insert(task_a.id.clone());
        let mut tasks = HashMap::new();
        tasks.insert(task_a.id.clone(), task_a.clone());
        tasks.insert(task_b.id.clone(), task_b.clone());
        let state = ExecutorState::new("g1", tasks);

        let checkpointed = CheckpointedState::from(&state);
        let json = serde_json::to_string(&checkpointed).unwrap();
        let decoded: CheckpointedState = serde_json::from_str(&json).unwrap();
        let restored: ExecutorState = decoded.into();

        assert_eq!(restored.tasks[&task_a.id].downstream, task_a.downstream);
        assert_eq!(restored.tasks[&task_b.id].upstream, task_b.upstream);
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let json = serde_json::json!({
            "graph_id": "g1",
            "tasks": {},
            "status": {},
            "results": {},
            "pending": [],
            "failed": [],
            "skipped": [],
            "schema_version": 7
        });
        let decoded: CheckpointedState = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.extra.get("schema_version").unwrap(), 7);
        let reencoded = serde_json::to_value(&decoded).unwrap();
        assert_eq!(reencoded["schema_version"], 7);
    }
}
