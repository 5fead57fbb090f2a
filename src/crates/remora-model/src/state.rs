//! `ExecutorState` and `ResultSummary` — the mutable state owned by one
//! run's executor (§3).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::task::AgentTask;

/// Lifecycle status of one [`AgentTask`] within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// Serialisable outcome of one agent task (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub task_id: String,
    pub success: bool,
    /// Truncated to the executor's configured limit.
    pub output: String,
    /// Present iff `success == false`.
    pub error: Option<String>,
}

impl ResultSummary {
    pub fn success(task_id: impl Into<String>, output: String, limit: usize) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            output: truncate(output, limit),
            error: None,
        }
    }

    pub fn failure(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }
}

fn truncate(s: String, limit: usize) -> String {
    if s.len() <= limit {
        s
    } else {
        s.chars().take(limit).collect()
    }
}

/// Mutable state owned exclusively by one run's executor.
///
/// Invariant (§3): `pending ∪ running ∪ completed ∪ failed ∪ skipped`
/// partitions `tasks` at all times; a task is in `completed` iff it has
/// an entry in `results`. Transitions are monotone — `running -> pending`
/// and any transition out of a terminal status are refused by
/// [`ExecutorState::transition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorState {
    pub graph_id: String,
    pub tasks: HashMap<String, AgentTask>,
    pub status: HashMap<String, TaskStatus>,
    pub results: HashMap<String, ResultSummary>,
    pub failed: HashSet<String>,
    pub skipped: HashSet<String>,
}

impl ExecutorState {
    /// Initialise state for a freshly built graph: every task starts
    /// `pending` (§4.6 step 1).
    pub fn new(graph_id: impl Into<String>, tasks: HashMap<String, AgentTask>) -> Self {
        let status = tasks
            .keys()
            .map(|id| (id.clone(), TaskStatus::Pending))
            .collect();
        Self {
            graph_id: graph_id.into(),
            tasks,
            status,
            results: HashMap::new(),
            failed: HashSet::new(),
            skipped: HashSet::new(),
        }
    }

    pub fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        self.status.get(task_id).copied()
    }

    /// Apply a status transition, enforcing the monotonicity invariant.
    ///
    /// Refuses `running -> pending` and any transition out of a terminal
    /// status ({completed, failed, skipped}).
    pub fn transition(&mut self, task_id: &str, to: TaskStatus) -> Result<()> {
        let from = self
            .status
            .get(task_id)
            .copied()
            .unwrap_or(TaskStatus::Pending);

        let terminal = matches!(
            from,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        );
        let illegal_backslide = from == TaskStatus::Running && to == TaskStatus::Pending;
        if terminal || illegal_backslide {
            return Err(ModelError::InvalidTransition {
                task_id: task_id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        match to {
            TaskStatus::Failed => {
                self.failed.insert(task_id.to_string());
            }
            TaskStatus::Skipped => {
                self.skipped.insert(task_id.to_string());
            }
            _ => {}
        }
        self.status.insert(task_id.to_string(), to);
        Ok(())
    }

    /// Record a completed task's result; keeps `results` and `status` in
    /// sync ("a task is in completed iff it has an entry in results").
    pub fn complete(&mut self, result: ResultSummary) -> Result<()> {
        self.transition(&result.task_id, TaskStatus::Completed)?;
        self.results.insert(result.task_id.clone(), result);
        Ok(())
    }

    /// An externally-safe, cloned view for readers that must not share a
    /// mutable reference into executor-owned state (§5).
    pub fn snapshot(&self) -> ExecutorStateView {
        ExecutorStateView {
            graph_id: self.graph_id.clone(),
            status: self.status.clone(),
            completed_count: self.results.len(),
            failed_count: self.failed.len(),
            skipped_count: self.skipped.len(),
        }
    }
}

/// A read-only, cloned snapshot of [`ExecutorState`] for external
/// consumers (dashboard, checkpointer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorStateView {
    pub graph_id: String,
    pub status: HashMap<String, TaskStatus>,
    pub completed_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SourceNode, NODE_TYPE_FUNCTION};
    use crate::task::BundleHandle;

    fn one_task_state() -> ExecutorState {
        let node = SourceNode::new(NODE_TYPE_FUNCTION, "foo", "/a.rs", "fn foo(){}", 1, 1);
        let task = AgentTask::new(node.clone(), BundleHandle::new("b"), 0);
        let mut tasks = HashMap::new();
        tasks.insert(node.id.clone(), task);
        ExecutorState::new("run-1", tasks)
    }

    #[test]
    fn starts_pending() {
        let state = one_task_state();
        let (id, _) = state.tasks.iter().next().unwrap();
        assert_eq!(state.status_of(id), Some(TaskStatus::Pending));
    }

    #[test]
    fn refuses_running_to_pending() {
        let mut state = one_task_state();
        let id = state.tasks.keys().next().unwrap().clone();
        state.transition(&id, TaskStatus::Running).unwrap();
        assert!(state.transition(&id, TaskStatus::Pending).is_err());
    }

    #[test]
    fn refuses_transition_out_of_terminal() {
        let mut state = one_task_state();
        let id = state.tasks.keys().next().unwrap().clone();
        state.transition(&id, TaskStatus::Running).unwrap();
        state.transition(&id, TaskStatus::Failed).unwrap();
        assert!(state.transition(&id, TaskStatus::Running).is_err());
        assert!(state.failed.contains(&id));
    }

    #[test]
    fn complete_keeps_results_in_sync() {
        let mut state = one_task_state();
        let id = state.tasks.keys().next().unwrap().clone();
        state.transition(&id, TaskStatus::Running).unwrap();
        state
            .complete(ResultSummary::success(id.clone(), "ok".into(), 100))
            .unwrap();
        assert_eq!(state.status_of(&id), Some(TaskStatus::Completed));
        assert!(state.results.contains_key(&id));
    }
}
