//! Chunk extraction primitives shared by every language walker.

use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use std::collections::HashSet;
use tree_sitter::Node;

/// Language-specific CST walk producing chunks.
///
/// Implementations recurse depth-first over named children, maintain their
/// own qualification context and emit through a [`ChunkSink`].
pub trait ChunkExtractor: Send + Sync {
    /// Lowercase language identifier stamped on emitted chunks.
    fn language(&self) -> &'static str;

    /// Walk the tree rooted at `root` and return the extracted chunks.
    fn extract(
        &self,
        root: Node<'_>,
        source: &str,
        coords: &SourceCoordinates,
        source_file: &str,
    ) -> Result<Vec<Chunk>>;
}

/// Collects chunks for one parse call, deduplicating at emission time.
///
/// The dedup key is `entity_name|start_byte|end_byte`; the first occurrence
/// wins. Walkers that distinguish overloads on kind (C++) prepend the
/// entity type to the key.
pub struct ChunkSink<'a> {
    language: &'static str,
    source: &'a str,
    coords: &'a SourceCoordinates,
    source_file: &'a str,
    type_keyed: bool,
    seen: HashSet<String>,
    chunks: Vec<Chunk>,
}

impl<'a> ChunkSink<'a> {
    pub fn new(
        language: &'static str,
        source: &'a str,
        coords: &'a SourceCoordinates,
        source_file: &'a str,
    ) -> Self {
        Self {
            language,
            source,
            coords,
            source_file,
            type_keyed: false,
            seen: HashSet::new(),
            chunks: Vec::new(),
        }
    }

    /// Include the entity type in the dedup key.
    pub fn with_type_keyed_dedup(mut self) -> Self {
        self.type_keyed = true;
        self
    }

    /// Emit one chunk covering `node`, unless its dedup key was seen.
    pub fn emit(
        &mut self,
        entity_type: EntityType,
        entity_name: &str,
        node: Node<'_>,
        attributes: &IndexMap<String, String>,
    ) -> Result<()> {
        let start_byte = node.start_byte();
        let end_byte = node.end_byte();
        let key = if self.type_keyed {
            format!("{}|{entity_name}|{start_byte}|{end_byte}", entity_type.as_str())
        } else {
            format!("{entity_name}|{start_byte}|{end_byte}")
        };
        if !self.seen.insert(key) {
            return Ok(());
        }

        let start_line = self.coords.to_line_number(start_byte);
        let end_line = self
            .coords
            .to_line_number(end_byte.saturating_sub(1).max(start_byte));
        let chunk = Chunk::new(
            self.language,
            entity_type,
            entity_name,
            self.source_file,
            &self.source[start_byte..end_byte],
            (start_line, end_line),
            (start_byte, end_byte),
            Some(attributes),
        )?;
        self.chunks.push(chunk);
        Ok(())
    }

    /// Finished chunk list, in emission (pre-order) order.
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// Raw source text of a node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Text of a named field, if present.
pub fn field_text<'a>(node: Node<'_>, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|child| node_text(child, source))
}

/// Named children of a node, left to right.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// First named child with the given kind.
pub fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node).into_iter().find(|c| c.kind() == kind)
}

/// All children (named or not), left to right.
pub fn all_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Join non-empty parts with a separator, skipping blanks.
pub fn join_qualified(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(separator)
}
