//! The `WorkspaceStore` trait (§4.4, "Workspace store") and its in-process
//! reference implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::warn;

use crate::error::{Result, WorkspaceError};

/// The isolation mechanism a [`crate::manager::WorkspaceManager`] drives.
///
/// The manager owns lifecycle policy (seeding, the ready barrier,
/// serialising accept/reject); a store only needs to implement
/// copy-on-write reads/writes and the three mutating operations named in
/// §4.4 exactly: `accept`, `reject`, `close`. Other concrete backends
/// (content-addressed, reflink, git-worktree) are external collaborators
/// per §1 — this crate ships only [`MemoryStore`].
pub trait WorkspaceStore: Send + Sync {
    /// Register a new workspace. `parent` is `None` for the stable base
    /// and `Some(stable_base_id)` for a per-agent child.
    fn open(&self, id: &str, parent: Option<&str>) -> Result<()>;

    /// Read `path`, falling through to the parent chain if this
    /// workspace has no local entry for it.
    fn read(&self, id: &str, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Write `path` locally. Returns `false` on failure (per §4.4,
    /// "a failed write ... surfaces as ... a boolean return") rather than
    /// an `Err`, since a write failure must never corrupt the base.
    fn write(&self, id: &str, path: &Path, contents: Vec<u8>) -> bool;

    /// Whether `path` is visible to `id`, locally or through its parent.
    fn exists(&self, id: &str, path: &Path) -> Result<bool>;

    /// All entries this workspace has written locally (not the parent's).
    fn snapshot(&self, id: &str) -> Result<HashMap<PathBuf, Vec<u8>>>;

    /// Replace this workspace's local entries wholesale, creating it
    /// (with the given parent) if it does not already exist. Used to
    /// resume from a checkpoint.
    fn restore(&self, id: &str, parent: Option<&str>, entries: HashMap<PathBuf, Vec<u8>>) -> Result<()>;

    /// Atomically merge `id`'s local entries into its parent, then
    /// destroy `id`. From any reader's viewpoint either every merged
    /// write is visible or none are (§4.4).
    fn accept(&self, id: &str) -> Result<()>;

    /// Destroy `id` with no effect on its parent.
    fn reject(&self, id: &str) -> Result<()>;

    /// Destroy `id` without merging, used for run teardown of workspaces
    /// that were never explicitly accepted or rejected.
    fn close(&self, id: &str) -> Result<()>;
}

struct Workspace {
    parent: Option<String>,
    data: DashMap<PathBuf, Vec<u8>>,
}

/// An in-process copy-on-write `WorkspaceStore`: each workspace is a
/// `DashMap` of locally written entries plus a parent pointer, with
/// reads falling through the parent chain. Good enough to make every
/// isolation invariant in §8 testable without a real filesystem.
#[derive(Default)]
pub struct MemoryStore {
    workspaces: DashMap<String, Workspace>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkspaceStore for MemoryStore {
    fn open(&self, id: &str, parent: Option<&str>) -> Result<()> {
        if self.workspaces.contains_key(id) {
            return Err(WorkspaceError::AlreadyExists(id.to_string()));
        }
        self.workspaces.insert(
            id.to_string(),
            Workspace {
                parent: parent.map(|p| p.to_string()),
                data: DashMap::new(),
            },
        );
        Ok(())
    }

    fn read(&self, id: &str, path: &Path) -> Result<Option<Vec<u8>>> {
        let mut current = id.to_string();
        loop {
            let ws = self
                .workspaces
                .get(&current)
                .ok_or_else(|| WorkspaceError::NotFound(current.clone()))?;
            if let Some(entry) = ws.data.get(path) {
                return Ok(Some(entry.clone()));
            }
            match ws.parent.clone() {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    fn write(&self, id: &str, path: &Path, contents: Vec<u8>) -> bool {
        match self.workspaces.get(id) {
            Some(ws) => {
                ws.data.insert(path.to_path_buf(), contents);
                true
            }
            None => {
                warn!(id, path = %path.display(), "write to unknown workspace");
                false
            }
        }
    }

    fn exists(&self, id: &str, path: &Path) -> Result<bool> {
        Ok(self.read(id, path)?.is_some())
    }

    fn snapshot(&self, id: &str) -> Result<HashMap<PathBuf, Vec<u8>>> {
        let ws = self
            .workspaces
            .get(id)
            .ok_or_else(|| WorkspaceError::NotFound(id.to_string()))?;
        Ok(ws.data.iter().map(|e| (e.key().clone(), e.value().clone())).collect())
    }

    fn restore(&self, id: &str, parent: Option<&str>, entries: HashMap<PathBuf, Vec<u8>>) -> Result<()> {
        if !self.workspaces.contains_key(id) {
            self.open(id, parent)?;
        }
        let ws = self.workspaces.get(id).expect("just opened");
        ws.data.clear();
        for (path, contents) in entries {
            ws.data.insert(path, contents);
        }
        Ok(())
    }

    fn accept(&self, id: &str) -> Result<()> {
        let parent_id = {
            let ws = self
                .workspaces
                .get(id)
                .ok_or_else(|| WorkspaceError::NotFound(id.to_string()))?;
            ws.parent.clone().ok_or_else(|| WorkspaceError::NoParent(id.to_string()))?
        };
        let (_, child) = self
            .workspaces
            .remove(id)
            .ok_or_else(|| WorkspaceError::NotFound(id.to_string()))?;
        let parent = self
            .workspaces
            .get(&parent_id)
            .ok_or_else(|| WorkspaceError::NotFound(parent_id.clone()))?;
        for (path, contents) in child.data {
            parent.data.insert(path, contents);
        }
        Ok(())
    }

    fn reject(&self, id: &str) -> Result<()> {
        self.workspaces
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| WorkspaceError::NotFound(id.to_string()))
    }

    fn close(&self, id: &str) -> Result<()> {
        self.workspaces.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_read_falls_through_to_parent() {
        let store = MemoryStore::new();
        store.open("base", None).unwrap();
        store.write("base", Path::new("a.txt"), b"base".to_vec());
        store.open("child", Some("base")).unwrap();
        assert_eq!(store.read("child", Path::new("a.txt")).unwrap(), Some(b"base".to_vec()));
    }

    #[test]
    fn child_write_is_invisible_to_sibling() {
        let store = MemoryStore::new();
        store.open("base", None).unwrap();
        store.open("child-a", Some("base")).unwrap();
        store.open("child-b", Some("base")).unwrap();
        store.write("child-a", Path::new("a.txt"), b"from-a".to_vec());
        assert_eq!(store.read("child-b", Path::new("a.txt")).unwrap(), None);
        assert_eq!(store.read("child-a", Path::new("a.txt")).unwrap(), Some(b"from-a".to_vec()));
    }

    #[test]
    fn accept_merges_into_parent_and_destroys_child() {
        let store = MemoryStore::new();
        store.open("base", None).unwrap();
        store.open("child", Some("base")).unwrap();
        store.write("child", Path::new("a.txt"), b"written".to_vec());
        store.accept("child").unwrap();
        assert_eq!(store.read("base", Path::new("a.txt")).unwrap(), Some(b"written".to_vec()));
        assert!(matches!(store.read("child", Path::new("a.txt")), Err(WorkspaceError::NotFound(_))));
    }

    #[test]
    fn reject_leaves_parent_untouched() {
        let store = MemoryStore::new();
        store.open("base", None).unwrap();
        store.open("child", Some("base")).unwrap();
        store.write("child", Path::new("a.txt"), b"written".to_vec());
        store.reject("child").unwrap();
        assert_eq!(store.read("base", Path::new("a.txt")).unwrap(), None);
    }

    #[test]
    fn last_accepted_wins_on_conflicting_path() {
        let store = MemoryStore::new();
        store.open("base", None).unwrap();
        store.open("a", Some("base")).unwrap();
        store.open("b", Some("base")).unwrap();
        store.write("a", Path::new("config.txt"), b"from-a".to_vec());
        store.write("b", Path::new("config.txt"), b"from-b".to_vec());
        store.accept("a").unwrap();
        store.accept("b").unwrap();
        assert_eq!(
            store.read("base", Path::new("config.txt")).unwrap(),
            Some(b"from-b".to_vec())
        );
    }
}
