//! `SourceNode` — an immutable discovered syntactic unit.
//!
//! See `spec.md` §3. A node's `id` is a deterministic function of its
//! path, type and name so that unchanged files produce stable ids across
//! runs (§8, "ID stability").

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The kind of syntactic construct a [`SourceNode`] represents.
///
/// Deliberately an open string rather than a closed enum: §3 calls the
/// variant set open ("implementer adds new kinds as languages are
/// added"), and a closed Rust enum would force every new language pack
/// to land a core-crate change. `file`/`class`/`function`/`method` are
/// the built-in kinds every discovery pass may produce; callers pass
/// their own for language-specific constructs (e.g. `section`, `table`).
pub type NodeType = String;

/// The built-in file-level node kind.
pub const NODE_TYPE_FILE: &str = "file";
/// The built-in class-level node kind.
pub const NODE_TYPE_CLASS: &str = "class";
/// The built-in function-level node kind.
pub const NODE_TYPE_FUNCTION: &str = "function";
/// The built-in method-level node kind.
pub const NODE_TYPE_METHOD: &str = "method";

/// An immutable, discovered syntactic unit — a file, class, function,
/// method, or any other language-specific construct a [`LanguagePack`]
/// extraction query produces.
///
/// [`LanguagePack`]: https://docs.rs/remora-discovery (crate boundary; see remora-discovery)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNode {
    /// First 16 hex chars of `sha256(canonical_path | ":" | type | ":" | name)`.
    pub id: String,
    /// Node kind; see [`NodeType`].
    pub node_type: NodeType,
    /// Short identifier; the file stem for `file` nodes.
    pub name: String,
    /// Absolute, canonical path to the file the node was found in.
    pub file_path: String,
    /// Exact source slice of the node.
    pub text: String,
    /// 1-indexed inclusive start line.
    pub start_line: usize,
    /// 1-indexed inclusive end line.
    pub end_line: usize,
}

impl SourceNode {
    /// Derive the deterministic id for `(canonical_path, node_type, name)`.
    ///
    /// Stable across reformatting that doesn't touch path/type/name, per
    /// the §3 invariant.
    pub fn derive_id(canonical_path: &str, node_type: &str, name: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(canonical_path.as_bytes());
        hasher.update(b":");
        hasher.update(node_type.as_bytes());
        hasher.update(b":");
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        hex16(&digest)
    }

    /// Build a node, deriving its id from the given fields.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node_type: impl Into<String>,
        name: impl Into<String>,
        file_path: impl Into<String>,
        text: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        let node_type = node_type.into();
        let name = name.into();
        let file_path = file_path.into();
        let id = Self::derive_id(&file_path, &node_type, &name);
        Self {
            id,
            node_type,
            name,
            file_path,
            text: text.into(),
            start_line,
            end_line,
        }
    }

    /// Rebuild a node with the same fields but a disambiguated name,
    /// re-deriving its id. Used by discovery when two nodes in one run
    /// would otherwise collide on id (§4.2, "Errors").
    pub fn disambiguated(mut self, counter: usize) -> Self {
        self.name = format!("{}#{}", self.name, counter);
        self.id = Self::derive_id(&self.file_path, &self.node_type, &self.name);
        self
    }
}

fn hex16(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(16);
    for byte in bytes.iter().take(8) {
        s.push_str(&format!("{byte:02x}"));
    }
    s
}

/// Sort key used to make discovery output deterministic: `(file_path,
/// start_line, node_type)` per §4.2 "Ordering".
pub fn sort_key(node: &SourceNode) -> (String, usize, String) {
    (
        node.file_path.clone(),
        node.start_line,
        node.node_type.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_stable_for_unchanged_fields() {
        let a = SourceNode::derive_id("/a/b.rs", NODE_TYPE_FUNCTION, "foo");
        let b = SourceNode::derive_id("/a/b.rs", NODE_TYPE_FUNCTION, "foo");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn id_differs_on_any_key_field() {
        let base = SourceNode::derive_id("/a/b.rs", NODE_TYPE_FUNCTION, "foo");
        assert_ne!(base, SourceNode::derive_id("/a/c.rs", NODE_TYPE_FUNCTION, "foo"));
        assert_ne!(base, SourceNode::derive_id("/a/b.rs", NODE_TYPE_METHOD, "foo"));
        assert_ne!(base, SourceNode::derive_id("/a/b.rs", NODE_TYPE_FUNCTION, "bar"));
    }

    #[test]
    fn disambiguation_changes_id_but_keeps_type() {
        let node = SourceNode::new(NODE_TYPE_FUNCTION, "foo", "/a/b.rs", "fn foo() {}", 1, 1);
        let disambiguated = node.clone().disambiguated(1);
        assert_ne!(node.id, disambiguated.id);
        assert_eq!(node.node_type, disambiguated.node_type);
        assert_eq!(disambiguated.name, "foo#1");
    }
}
