//! Lifecycle owner for one run's stable base and per-agent child
//! workspaces (§4.4).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::{Result, WorkspaceError};
use crate::store::WorkspaceStore;

/// Directory names and a dotfile rule applied while seeding the stable
/// base from the project root (§4.4, "Seeded from the project root by
/// copying every file not matching the ignore set").
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub ignored_dirs: HashSet<String>,
    pub skip_dotfiles: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: [".git", "target", "node_modules", ".venv"].iter().map(|s| s.to_string()).collect(),
            skip_dotfiles: true,
        }
    }
}

const STABLE_BASE_ID: &str = "__stable__";

/// Owns one run's workspace lifecycle: seeds the stable base, hands out
/// per-agent children on first request, and serialises every accept/reject
/// against the base (§4.4, "Accept MUST be serialised").
pub struct WorkspaceManager<S: WorkspaceStore> {
    graph_id: String,
    store: Arc<S>,
    children: DashSet<String>,
    mutation_lock: Mutex<()>,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
}

impl<S: WorkspaceStore> WorkspaceManager<S> {
    pub fn new(graph_id: impl Into<String>, store: Arc<S>) -> Self {
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            graph_id: graph_id.into(),
            store,
            children: DashSet::new(),
            mutation_lock: Mutex::new(()),
            ready_tx,
            ready_rx,
        }
    }

    fn base_id(&self) -> String {
        format!("{}:{STABLE_BASE_ID}", self.graph_id)
    }

    /// Seed the stable base from `project_root`, then release the `ready`
    /// barrier. Every other operation on this manager suspends until this
    /// completes (§4.4).
    pub async fn seed(&self, project_root: &Path, config: &WorkspaceConfig) -> Result<()> {
        let base_id = self.base_id();
        self.store.open(&base_id, None)?;

        let mut stack = vec![project_root.to_path_buf()];
        let mut seeded = 0usize;
        while let Some(dir) = stack.pop() {
            let entries = std::fs::read_dir(&dir).map_err(|e| WorkspaceError::SeedFailed {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(error = %err, "seeding directory entry error, skipping");
                        continue;
                    }
                };
                let path = entry.path();
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if config.ignored_dirs.contains(name.as_ref()) {
                    continue;
                }
                if config.skip_dotfiles && name.starts_with('.') {
                    continue;
                }
                let file_type = match entry.file_type() {
                    Ok(ft) => ft,
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "failed to stat during seeding, skipping");
                        continue;
                    }
                };
                if file_type.is_dir() {
                    stack.push(path);
                } else if file_type.is_file() {
                    let rel = path.strip_prefix(project_root).unwrap_or(&path).to_path_buf();
                    match std::fs::read(&path) {
                        Ok(bytes) => {
                            self.store.write(&base_id, &rel, bytes);
                            seeded += 1;
                        }
                        Err(err) => warn!(path = %path.display(), error = %err, "failed to read file during seeding, skipping"),
                    }
                }
            }
        }

        info!(graph_id = %self.graph_id, files = seeded, "stable base seeded");
        let _ = self.ready_tx.send(true);
        Ok(())
    }

    /// Suspend until `seed` has completed.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }

    /// Return the workspace for `agent_id`, creating it on first call
    /// (§4.4). Its reads fall through to the stable base.
    pub async fn get(&self, agent_id: &str) -> Result<()> {
        self.wait_ready().await;
        if self.children.insert(agent_id.to_string()) {
            match self.store.open(agent_id, Some(&self.base_id())) {
                Ok(()) | Err(WorkspaceError::AlreadyExists(_)) => {}
                Err(err) => return Err(err),
            }
            debug!(agent_id, "agent workspace created");
        }
        Ok(())
    }

    pub async fn read(&self, agent_id: &str, path: &Path) -> Result<Option<Vec<u8>>> {
        self.wait_ready().await;
        self.store.read(agent_id, path)
    }

    /// Write `path` in `agent_id`'s workspace. Returns `false` on a
    /// logged, non-corrupting failure (§4.4, "Failure modes").
    pub async fn write(&self, agent_id: &str, path: &Path, contents: Vec<u8>) -> bool {
        self.wait_ready().await;
        self.store.write(agent_id, path, contents)
    }

    /// Merge `agent_id`'s writes into the stable base and destroy it.
    /// Serialised against every other accept/reject on this run.
    pub async fn accept(&self, agent_id: &str) -> Result<()> {
        let _guard = self.mutation_lock.lock().await;
        let result = self.store.accept(agent_id);
        self.children.remove(agent_id);
        if result.is_ok() {
            info!(agent_id, "workspace accepted");
        }
        result
    }

    /// Destroy `agent_id`'s workspace with no effect on the base.
    pub async fn reject(&self, agent_id: &str) -> Result<()> {
        let _guard = self.mutation_lock.lock().await;
        let result = self.store.reject(agent_id);
        self.children.remove(agent_id);
        if result.is_ok() {
            info!(agent_id, "workspace rejected");
        }
        result
    }

    /// Ids of every live child workspace, for the checkpointer to snapshot.
    pub fn live_children(&self) -> Vec<String> {
        self.children.iter().map(|id| id.clone()).collect()
    }

    /// The stable base's storage id, for the checkpointer to snapshot.
    pub fn base_workspace_id(&self) -> String {
        self.base_id()
    }

    /// All entries `id` has written locally, for checkpoint save.
    pub fn snapshot(&self, id: &str) -> Result<std::collections::HashMap<PathBuf, Vec<u8>>> {
        self.store.snapshot(id)
    }

    /// Reopen `id` from a checkpointed snapshot. `parent` should be
    /// `Some(base_workspace_id())` for an agent child, `None` for the base.
    pub async fn restore_workspace(
        &self,
        id: &str,
        parent: Option<&str>,
        entries: std::collections::HashMap<PathBuf, Vec<u8>>,
    ) -> Result<()> {
        self.store.restore(id, parent, entries)?;
        if parent.is_some() {
            self.children.insert(id.to_string());
        }
        Ok(())
    }

    /// Destroy every remaining child workspace and, if `destroy_base`,
    /// the stable base itself (§4.4, "Teardown").
    pub fn teardown(&self, destroy_base: bool) {
        for agent_id in self.children.iter() {
            let _ = self.store.close(&agent_id);
        }
        self.children.clear();
        if destroy_base {
            let _ = self.store.close(&self.base_id());
        }
        info!(graph_id = %self.graph_id, destroy_base, "workspace manager torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn siblings_cannot_see_each_others_writes() {
        let store = Arc::new(MemoryStore::new());
        let manager = WorkspaceManager::new("g1", store);
        let dir = tempdir_with_file();
        manager.seed(dir.path(), &WorkspaceConfig::default()).await.unwrap();

        manager.get("agent-a").await.unwrap();
        manager.get("agent-b").await.unwrap();
        manager.write("agent-a", Path::new("new.txt"), b"secret".to_vec()).await;

        assert_eq!(manager.read("agent-b", Path::new("new.txt")).await.unwrap(), None);
        assert_eq!(
            manager.read("agent-a", Path::new("new.txt")).await.unwrap(),
            Some(b"secret".to_vec())
        );
    }

    #[tokio::test]
    async fn accepted_writes_are_visible_to_new_children() {
        let store = Arc::new(MemoryStore::new());
        let manager = WorkspaceManager::new("g1", store);
        let dir = tempdir_with_file();
        manager.seed(dir.path(), &WorkspaceConfig::default()).await.unwrap();

        manager.get("agent-a").await.unwrap();
        manager.write("agent-a", Path::new("new.txt"), b"value".to_vec()).await;
        manager.accept("agent-a").await.unwrap();

        manager.get("agent-c").await.unwrap();
        assert_eq!(
            manager.read("agent-c", Path::new("new.txt")).await.unwrap(),
            Some(b"value".to_vec())
        );
    }

    #[tokio::test]
    async fn reject_does_not_affect_base() {
        let store = Arc::new(MemoryStore::new());
        let manager = WorkspaceManager::new("g1", store);
        let dir = tempdir_with_file();
        manager.seed(dir.path(), &WorkspaceConfig::default()).await.unwrap();

        manager.get("agent-a").await.unwrap();
        manager.write("agent-a", Path::new("new.txt"), b"value".to_vec()).await;
        manager.reject("agent-a").await.unwrap();

        manager.get("agent-c").await.unwrap();
        assert_eq!(manager.read("agent-c", Path::new("new.txt")).await.unwrap(), None);
    }

    fn tempdir_with_file() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seed.txt"), b"seeded").unwrap();
        dir
    }
}
