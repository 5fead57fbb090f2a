use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use remora_events::{Event, EventBus};
use remora_model::ExecutorState;
use remora_workspace::{WorkspaceManager, WorkspaceStore};
use tracing::info;

use crate::error::{CheckpointError, Result};
use crate::state::CheckpointedState;

const STATE_FILE: &str = "state.json";
const STABLE_SNAPSHOT_DIR: &str = "__stable__";

/// Persists and restores a partially executed graph plus its workspace
/// snapshots (§4.7), using the on-disk layout fixed by §6:
/// `<root>/<checkpoint_id>/{state.json, __stable__/, <agent_id>/}`.
pub struct CheckpointManager<S: WorkspaceStore> {
    root: PathBuf,
    workspaces: Arc<WorkspaceManager<S>>,
    bus: Arc<EventBus>,
}

impl<S: WorkspaceStore> CheckpointManager<S> {
    pub fn new(root: impl Into<PathBuf>, workspaces: Arc<WorkspaceManager<S>>, bus: Arc<EventBus>) -> Self {
        Self { root: root.into(), workspaces, bus }
    }

    /// Save `state` and a snapshot of every live workspace, returning the
    /// new checkpoint id. Emits `CheckpointSaved` on success.
    pub async fn save(&self, state: &ExecutorState) -> Result<String> {
        let checkpoint_id = uuid::Uuid::new_v4().to_string();
        let dir = self.root.join(&checkpoint_id);
        std::fs::create_dir_all(&dir)?;

        let checkpointed = CheckpointedState::from(state);
        let bytes = serde_json::to_vec_pretty(&checkpointed)?;
        std::fs::write(dir.join(STATE_FILE), bytes)?;

        let base_entries = self
            .workspaces
            .snapshot(&self.workspaces.base_workspace_id())
            .map_err(|e| CheckpointError::Workspace(e.to_string()))?;
        write_tree(&dir.join(STABLE_SNAPSHOT_DIR), &base_entries)?;

        for agent_id in self.workspaces.live_children() {
            let entries = self
                .workspaces
                .snapshot(&agent_id)
                .map_err(|e| CheckpointError::Workspace(e.to_string()))?;
            write_tree(&dir.join(&agent_id), &entries)?;
        }

        self.bus.emit(Event::CheckpointSaved {
            timestamp: Event::now_ts(),
            graph_id: state.graph_id.clone(),
            checkpoint_id: checkpoint_id.clone(),
        });
        info!(checkpoint_id = %checkpoint_id, graph_id = %state.graph_id, "checkpoint saved");
        Ok(checkpoint_id)
    }

    /// Restore `checkpoint_id`: rebuild [`ExecutorState`] and reopen every
    /// snapshotted workspace through the workspace manager. Emits
    /// `CheckpointRestored` on success.
    pub async fn restore(&self, checkpoint_id: &str) -> Result<ExecutorState> {
        let dir = self.root.join(checkpoint_id);
        if !dir.is_dir() {
            return Err(CheckpointError::NotFound(checkpoint_id.to_string()));
        }

        let raw = std::fs::read(dir.join(STATE_FILE))?;
        let checkpointed: CheckpointedState = serde_json::from_slice(&raw)?;
        let state: ExecutorState = checkpointed.into();

        let base_entries = read_tree(&dir.join(STABLE_SNAPSHOT_DIR))?;
        self.workspaces
            .restore_workspace(&self.workspaces.base_workspace_id(), None, base_entries)
            .await
            .map_err(|e| CheckpointError::Workspace(e.to_string()))?;

        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == STABLE_SNAPSHOT_DIR || !entry.file_type()?.is_dir() {
                continue;
            }
            let entries = read_tree(&entry.path())?;
            self.workspaces
                .restore_workspace(&name, Some(&self.workspaces.base_workspace_id()), entries)
                .await
                .map_err(|e| CheckpointError::Workspace(e.to_string()))?;
        }

        self.bus.emit(Event::CheckpointRestored {
            timestamp: Event::now_ts(),
            graph_id: state.graph_id.clone(),
            checkpoint_id: checkpoint_id.to_string(),
        });
        info!(checkpoint_id, "checkpoint restored");
        Ok(state)
    }

    /// List checkpoint ids under the root, most recently created last.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Remove a checkpoint's directory tree and all associated snapshots.
    pub fn delete(&self, checkpoint_id: &str) -> Result<()> {
        let dir = self.root.join(checkpoint_id);
        if !dir.is_dir() {
            return Err(CheckpointError::NotFound(checkpoint_id.to_string()));
        }
        std::fs::remove_dir_all(dir)?;
        Ok(())
    }
}

fn write_tree(dir: &Path, entries: &HashMap<PathBuf, Vec<u8>>) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (rel, bytes) in entries {
        let dest = dir.join(rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, bytes)?;
    }
    Ok(())
}

fn read_tree(dir: &Path) -> Result<HashMap<PathBuf, Vec<u8>>> {
    let mut entries = HashMap::new();
    if !dir.is_dir() {
        return Ok(entries);
    }
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(dir).unwrap_or(&path).to_path_buf();
                entries.insert(rel, std::fs::read(&path)?);
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_workspace::MemoryStore;
    use std::path::Path;

    async fn manager_with_seeded_base() -> (CheckpointManager<MemoryStore>, tempfile::TempDir, Arc<WorkspaceManager<MemoryStore>>) {
        let checkpoint_root = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        std::fs::write(project.path().join("seed.txt"), b"base").unwrap();

        let store = Arc::new(MemoryStore::new());
        let workspaces = Arc::new(WorkspaceManager::new("g1", store));
        workspaces.seed(project.path(), &Default::default()).await.unwrap();

        let bus = Arc::new(EventBus::new());
        let manager = CheckpointManager::new(checkpoint_root.path(), workspaces.clone(), bus);
        (manager, checkpoint_root, workspaces)
    }

    #[tokio::test]
    async fn save_then_restore_round_trips_task_state() {
        let (manager, _root, workspaces) = manager_with_seeded_base().await;
        workspaces.get("agent-1").await.unwrap();
        workspaces.write("agent-1", Path::new("out.txt"), b"partial work".to_vec()).await;

        let node = remora_model::SourceNode::new("function", "foo", "/a.rs", "", 1, 1);
        let task = remora_model::AgentTask::new(node.clone(), remora_model::BundleHandle::new("b"), 0);
        let mut tasks = std::collections::HashMap::new();
        tasks.insert(node.id.clone(), task);
        let mut state = ExecutorState::new("g1", tasks.clone());
        state.transition(&node.id, remora_model::TaskStatus::Running).unwrap();

        let checkpoint_id = manager.save(&state).await.unwrap();
        let restored = manager.restore(&checkpoint_id).await.unwrap();
        assert_eq!(restored.status_of(&node.id), Some(remora_model::TaskStatus::Pending));
    }

    #[tokio::test]
    async fn list_and_delete_round_trip() {
        let (manager, _root, _workspaces) = manager_with_seeded_base().await;
        let state = ExecutorState::new("g1", std::collections::HashMap::new());
        let id = manager.save(&state).await.unwrap();
        assert!(manager.list().unwrap().contains(&id));
        manager.delete(&id).unwrap();
        assert!(!manager.list().unwrap().contains(&id));
    }

    #[tokio::test]
    async fn restore_of_unknown_id_is_an_error() {
        let (manager, _root, _workspaces) = manager_with_seeded_base().await;
        assert!(manager.restore("does-not-exist").await.is_err());
    }
}
