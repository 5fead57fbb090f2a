use std::collections::{HashMap, HashSet};
use std::path::Path;

use ignore::WalkBuilder;
use remora_model::{sort_key, SourceNode, NODE_TYPE_FILE};
use tracing::warn;

use crate::config::DiscoveryConfig;
use crate::error::Result;
use crate::language_pack::LanguagePack;

/// Extension → pack lookup. Built-ins register themselves via
/// [`LanguagePackRegistry::with_builtins`]; callers add more with
/// [`LanguagePackRegistry::register`].
#[derive(Default)]
pub struct LanguagePackRegistry {
    by_extension: HashMap<String, std::sync::Arc<dyn LanguagePack>>,
}

impl LanguagePackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(crate::language_pack::RustLanguagePack);
        registry
    }

    /// Register a pack for every extension it claims. A later registration
    /// for the same extension replaces the earlier one.
    pub fn register(&mut self, pack: impl LanguagePack + 'static) {
        let shared: std::sync::Arc<dyn LanguagePack> = std::sync::Arc::new(pack);
        for ext in shared.extensions() {
            self.by_extension.insert((*ext).to_string(), shared.clone());
        }
    }

    fn pack_for(&self, extension: &str) -> Option<&dyn LanguagePack> {
        self.by_extension.get(extension).map(|p| p.as_ref())
    }
}

/// Walk `roots`, extracting [`SourceNode`]s per §4.2.
///
/// Returns nodes sorted by `(file_path, start_line, type)`. ID collisions
/// within the run are disambiguated with a counter and logged, never
/// treated as fatal.
pub fn discover(roots: &[impl AsRef<Path>], config: &DiscoveryConfig, registry: &LanguagePackRegistry) -> Result<Vec<SourceNode>> {
    if roots.is_empty() {
        return Err(crate::error::DiscoveryError::EmptyInput);
    }

    let mut nodes = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut collision_counters: HashMap<(String, String), usize> = HashMap::new();

    for root in roots {
        let root = root.as_ref();
        let ignored_dirs = config.ignored_dirs.clone();
        let skip_dotfiles = config.skip_dotfiles;
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .filter_entry(move |entry| {
                let name = entry.file_name().to_string_lossy();
                if ignored_dirs.contains(name.as_ref()) {
                    return false;
                }
                if skip_dotfiles && name.starts_with('.') && name != "." {
                    return false;
                }
                true
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "discovery walk entry error, skipping");
                    continue;
                }
            };
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if let Some(filter) = &config.language_filter {
                if !filter.contains(extension) {
                    continue;
                }
            }
            let Some(pack) = registry.pack_for(extension) else {
                continue;
            };

            let canonical = match path.canonicalize() {
                Ok(p) => p.to_string_lossy().into_owned(),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to canonicalize path, skipping");
                    continue;
                }
            };
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(path = %canonical, error = %err, "failed to read file, skipping");
                    continue;
                }
            };
            let text = match std::str::from_utf8(&bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!(path = %canonical, "file is not valid utf-8, skipping");
                    continue;
                }
            };

            let line_count = text.lines().count().max(1);
            let file_node = SourceNode::new(NODE_TYPE_FILE, file_stem(&canonical), canonical.clone(), text, 1, line_count);
            let mut file_nodes = vec![file_node];

            match pack.extract(&canonical, &bytes) {
                Ok(extracted) => file_nodes.extend(extracted),
                Err(err) => {
                    warn!(path = %canonical, error = %err, "extraction failed for file, skipping");
                    continue;
                }
            }

            for mut node in file_nodes {
                if let Some(filter) = &config.node_type_filter {
                    if !filter.contains(&node.node_type) {
                        continue;
                    }
                }
                if !seen_ids.insert(node.id.clone()) {
                    let key = (node.file_path.clone(), node.node_type.clone());
                    let counter = collision_counters.entry(key).or_insert(0);
                    *counter += 1;
                    warn!(id = %node.id, name = %node.name, "id collision during discovery, disambiguating");
                    node = node.disambiguated(*counter);
                    seen_ids.insert(node.id.clone());
                }
                nodes.push(node);
            }
        }
    }

    nodes.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    Ok(nodes)
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
