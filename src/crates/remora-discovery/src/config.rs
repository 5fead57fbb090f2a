use std::collections::HashSet;

/// In-memory discovery configuration (§4.2 inputs). Populating this from a
/// config file or CLI flags is the external collaborator's job (§1).
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Directory names skipped unconditionally, anywhere in the tree.
    pub ignored_dirs: HashSet<String>,
    /// Skip dotfiles and dot-directories.
    pub skip_dotfiles: bool,
    /// Restrict to these language pack keys; `None` means "every registered pack".
    pub language_filter: Option<HashSet<String>>,
    /// Restrict to these node types; `None` means "every node type a pack produces".
    pub node_type_filter: Option<HashSet<String>>,
    /// Advisory hint for the walker's parallelism; 0 lets `ignore` pick.
    pub concurrency_hint: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let ignored_dirs = [".git", "target", "node_modules", ".venv", "__pycache__", "dist", "build"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            ignored_dirs,
            skip_dotfiles: true,
            language_filter: None,
            node_type_filter: None,
            concurrency_hint: 0,
        }
    }
}
