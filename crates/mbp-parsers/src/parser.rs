//! Parser abstraction and the Tree-sitter parser base.
//!
//! `parse` isolates every per-file fault: apart from caller contract
//! violations (empty path, not a regular file) the worst outcome for a file
//! is an empty chunk list plus a log line. Transient parser and tree values
//! are scoped to one call and dropped on every exit path.

use crate::extractor::ChunkExtractor;
use mbp_domain::{Chunk, Error, Result, SourceCoordinates};
use mbp_grammars::GrammarManager;
use mbp_domain::GrammarSpec;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};
use tree_sitter::{Language, Node, Parser};

/// A parser for one language: file-extension matching plus chunk extraction.
pub trait SourceParser: Send + Sync {
    /// Lowercase language identifier.
    fn language(&self) -> &str;

    /// File extensions (with leading dot) this parser claims.
    fn extensions(&self) -> &[&'static str];

    /// Whether the lowercased file name ends in any claimed extension.
    fn supports(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_lowercase();
        self.extensions().iter().any(|ext| name.ends_with(ext))
    }

    /// Parse a file into chunks.
    ///
    /// Raises only on contract violations; every per-file fault yields an
    /// empty list.
    fn parse(&self, path: &Path) -> Result<Vec<Chunk>>;
}

/// Concrete parser over a dynamically managed Tree-sitter grammar.
pub struct TreeSitterParser {
    language: &'static str,
    extensions: &'static [&'static str],
    extractor: Box<dyn ChunkExtractor>,
    supplier: Box<dyn Fn() -> Option<Language> + Send + Sync>,
    native: Box<dyn Fn() -> Result<()> + Send + Sync>,
    /// Set once by the first parse; `false` marks the parser permanently
    /// degraded for this process.
    native_ready: OnceLock<bool>,
}

impl TreeSitterParser {
    /// Build a parser bound to a grammar spec and manager.
    pub fn new(
        spec: &GrammarSpec,
        manager: &Arc<GrammarManager>,
        extractor: Box<dyn ChunkExtractor>,
        extensions: &'static [&'static str],
    ) -> Self {
        let language = extractor.language();
        Self {
            language,
            extensions,
            extractor,
            supplier: Box::new(GrammarManager::language_supplier(manager, spec)),
            native: Box::new(GrammarManager::native_loader(manager, spec)),
            native_ready: OnceLock::new(),
        }
    }

    fn ensure_native(&self, path: &Path) -> bool {
        *self.native_ready.get_or_init(|| match (self.native)() {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    language = self.language,
                    path = %path.display(),
                    error = %err,
                    "native grammar load failed, parser degraded"
                );
                false
            }
        })
    }
}

impl SourceParser for TreeSitterParser {
    fn language(&self) -> &str {
        self.language
    }

    fn extensions(&self) -> &[&'static str] {
        self.extensions
    }

    fn parse(&self, path: &Path) -> Result<Vec<Chunk>> {
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_argument("path must not be empty"));
        }
        if !self.supports(path) {
            return Ok(Vec::new());
        }
        if !path.is_file() {
            return Err(Error::invalid_argument(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable source file");
                return Ok(Vec::new());
            }
        };

        if !self.ensure_native(path) {
            return Ok(Vec::new());
        }
        let Some(language) = (self.supplier)() else {
            warn!(
                language = self.language,
                path = %path.display(),
                "no grammar handle available"
            );
            return Ok(Vec::new());
        };

        // Parser and tree live for this call only
        let mut parser = Parser::new();
        if let Err(err) = parser.set_language(&language) {
            warn!(language = self.language, error = %err, "grammar rejected by parser");
            return Ok(Vec::new());
        }
        let Some(tree) = parser.parse(&source, None) else {
            warn!(path = %path.display(), "parser produced no tree");
            return Ok(Vec::new());
        };

        let coords = SourceCoordinates::new(&source);
        let file = path.to_string_lossy();
        let extracted = catch_unwind(AssertUnwindSafe(|| {
            self.extractor.extract(tree.root_node(), &source, &coords, &file)
        }));
        match extracted {
            Ok(Ok(chunks)) => {
                debug!(path = %path.display(), count = chunks.len(), "extracted chunks");
                Ok(chunks)
            }
            Ok(Err(err)) => {
                warn!(path = %path.display(), error = %err, "chunk extraction failed");
                Ok(Vec::new())
            }
            Err(_) => {
                warn!(path = %path.display(), "chunk extractor panicked");
                Ok(Vec::new())
            }
        }
    }
}

/// Iterative pre-order traversal; children are pushed in reverse so
/// visitation is left-to-right. Each node is visited exactly once.
pub fn traverse_depth_first<'t, F>(root: Node<'t>, mut visit: F)
where
    F: FnMut(Node<'t>),
{
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visit(node);
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_first_is_preorder_left_to_right() {
        let mut parser = Parser::new();
        parser
            .set_language(&mbp_grammars::bundled_language("python").unwrap())
            .unwrap();
        let source = "def a():\n    pass\n\ndef b():\n    pass\n";
        let tree = parser.parse(source, None).unwrap();

        let mut kinds = Vec::new();
        let mut starts = Vec::new();
        traverse_depth_first(tree.root_node(), |node| {
            if node.kind() == "function_definition" {
                kinds.push(node.kind().to_string());
                starts.push(node.start_byte());
            }
        });
        assert_eq!(kinds.len(), 2);
        assert!(starts[0] < starts[1], "left-to-right order");
    }

    #[test]
    fn each_node_visited_once() {
        let mut parser = Parser::new();
        parser
            .set_language(&mbp_grammars::bundled_language("python").unwrap())
            .unwrap();
        let tree = parser.parse("x = [1, 2, 3]\n", None).unwrap();

        let mut seen = std::collections::HashSet::new();
        traverse_depth_first(tree.root_node(), |node| {
            assert!(seen.insert(node.id()), "node visited twice");
        });
        assert!(!seen.is_empty());
    }
}
