//! Pluggable per-language extraction (§6, "Code-discovery grammars and
//! queries (consumed)").
//!
//! A `LanguagePack` turns file bytes into [`SourceNode`]s. The only
//! built-in pack is [`RustLanguagePack`]; additional languages register
//! under their own extension in a [`crate::walk::LanguagePackRegistry`]
//! without touching this module.

use remora_model::{SourceNode, NODE_TYPE_CLASS, NODE_TYPE_FUNCTION, NODE_TYPE_METHOD};
use tree_sitter::{Node, Parser};

use crate::error::{DiscoveryError, Result};

/// Extracts language-specific [`SourceNode`]s from one file's contents.
///
/// The `file`-typed node covering the whole file is produced by the
/// walker itself (§4.2: "Every file MUST additionally yield one
/// `file`-typed SourceNode"), not by the pack.
pub trait LanguagePack: Send + Sync {
    /// File extensions this pack claims, without the leading dot.
    fn extensions(&self) -> &[&str];

    /// Parse `source` (from `canonical_path`) and extract nodes below
    /// file level. Parse failures are reported as `Err`; the walker logs
    /// and skips the file per §4.2, it never aborts the run.
    fn extract(&self, canonical_path: &str, source: &[u8]) -> Result<Vec<SourceNode>>;
}

/// Built-in Rust pack backed by `tree-sitter-rust`.
///
/// Extracts top-level `function_item` and `struct_item` nodes, and every
/// `function_item` nested in an `impl_item`'s body as a `method` node —
/// the same child-walk-and-classify approach used for top-level item
/// extraction elsewhere in this corpus, rather than a `.scm` query (query
/// authoring is an external collaborator concern per §1).
#[derive(Debug, Default)]
pub struct RustLanguagePack;

impl LanguagePack for RustLanguagePack {
    fn extensions(&self) -> &[&str] {
        &["rs"]
    }

    fn extract(&self, canonical_path: &str, source: &[u8]) -> Result<Vec<SourceNode>> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| DiscoveryError::InvalidQueryPack("rust".into(), e.to_string()))?;

        let tree = match parser.parse(source, None) {
            Some(tree) => tree,
            None => return Ok(Vec::new()),
        };

        let mut nodes = Vec::new();
        let root = tree.root_node();
        for i in 0..root.child_count() {
            let Some(child) = root.child(i) else { continue };
            match child.kind() {
                "function_item" => {
                    if let Some(node) = named_node(child, canonical_path, source, NODE_TYPE_FUNCTION) {
                        nodes.push(node);
                    }
                }
                "struct_item" => {
                    if let Some(node) = named_node(child, canonical_path, source, NODE_TYPE_CLASS) {
                        nodes.push(node);
                    }
                }
                "impl_item" => {
                    nodes.extend(extract_methods(child, canonical_path, source));
                }
                _ => {}
            }
        }
        Ok(nodes)
    }
}

fn extract_methods(impl_node: Node, canonical_path: &str, source: &[u8]) -> Vec<SourceNode> {
    let Some(body) = impl_node.child_by_field_name("body") else {
        return Vec::new();
    };
    let mut methods = Vec::new();
    for i in 0..body.child_count() {
        let Some(child) = body.child(i) else { continue };
        if child.kind() == "function_item" {
            if let Some(node) = named_node(child, canonical_path, source, NODE_TYPE_METHOD) {
                methods.push(node);
            }
        }
    }
    methods
}

fn named_node(node: Node, canonical_path: &str, source: &[u8], node_type: &str) -> Option<SourceNode> {
    let name_node = node.child_by_field_name("name")?;
    let name = std::str::from_utf8(&source[name_node.start_byte()..name_node.end_byte()]).ok()?;
    let text = std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("");
    Some(SourceNode::new(
        node_type,
        name,
        canonical_path,
        text,
        node.start_position().row + 1,
        node.end_position().row + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
struct Foo {
    x: i32,
}

fn top_level() {}

impl Foo {
    fn method_one(&self) {}
    fn method_two(&self) {}
}
"#;

    #[test]
    fn extracts_struct_function_and_methods() {
        let pack = RustLanguagePack;
        let nodes = pack.extract("/a.rs", SAMPLE.as_bytes()).unwrap();
        let kinds: Vec<&str> = nodes.iter().map(|n| n.node_type.as_str()).collect();
        assert!(kinds.contains(&NODE_TYPE_CLASS));
        assert!(kinds.contains(&NODE_TYPE_FUNCTION));
        assert_eq!(kinds.iter().filter(|k| **k == NODE_TYPE_METHOD).count(), 2);
    }

    #[test]
    fn empty_file_yields_no_nodes() {
        let pack = RustLanguagePack;
        let nodes = pack.extract("/empty.rs", b"").unwrap();
        assert!(nodes.is_empty());
    }
}
