//! Language-specific chunk extractors.
//!
//! One module per language. All walkers share the same shape: a depth-first
//! pre-order walk over named children that emits a chunk when it meets a
//! type-defining or callable node, qualifying names against the stack of
//! enclosing scopes.

pub mod c;
pub mod cpp;
pub mod csharp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod kotlin;
pub mod php;
pub mod python;
pub mod ruby;
pub mod rust;
pub mod scala;
pub mod swift;
pub mod typescript;

use crate::parser::{SourceParser, TreeSitterParser};
use mbp_grammars::{GrammarManager, builtin_spec};
use std::sync::Arc;

macro_rules! ts_parser {
    ($manager:expr, $lang:literal, $extractor:expr, $exts:expr) => {
        Arc::new(TreeSitterParser::new(
            builtin_spec($lang).expect("built-in grammar spec"),
            $manager,
            Box::new($extractor),
            $exts,
        )) as Arc<dyn SourceParser>
    };
}

/// All Tree-sitter parsers in registration order.
///
/// C registers before C++ so `.h` resolves to C++; the Tree-sitter Java
/// parser is included but is shadowed by the built-in Java parser in the
/// default registry.
pub fn default_parsers(manager: &Arc<GrammarManager>) -> Vec<Arc<dyn SourceParser>> {
    vec![
        ts_parser!(manager, "c", c::CExtractor, &[".c", ".h"]),
        ts_parser!(
            manager,
            "cpp",
            cpp::CppExtractor,
            &[".cpp", ".cc", ".cxx", ".hpp", ".hh", ".h"]
        ),
        ts_parser!(manager, "csharp", csharp::CSharpExtractor, &[".cs"]),
        ts_parser!(manager, "go", go::GoExtractor, &[".go"]),
        ts_parser!(manager, "java", java::JavaExtractor, &[".java"]),
        ts_parser!(
            manager,
            "javascript",
            javascript::JavaScriptExtractor,
            &[".js", ".jsx", ".mjs"]
        ),
        ts_parser!(manager, "kotlin", kotlin::KotlinExtractor, &[".kt", ".kts"]),
        ts_parser!(manager, "php", php::PhpExtractor, &[".php"]),
        ts_parser!(manager, "python", python::PythonExtractor, &[".py"]),
        ts_parser!(manager, "ruby", ruby::RubyExtractor, &[".rb"]),
        ts_parser!(manager, "rust", rust::RustExtractor, &[".rs"]),
        ts_parser!(manager, "scala", scala::ScalaExtractor, &[".scala", ".sc"]),
        ts_parser!(manager, "swift", swift::SwiftExtractor, &[".swift"]),
        ts_parser!(
            manager,
            "typescript",
            typescript::TypeScriptExtractor,
            &[".ts", ".tsx"]
        ),
    ]
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::extractor::ChunkExtractor;
    use mbp_domain::{Chunk, SourceCoordinates};

    /// Parse `source` with the bundled grammar for `grammar_key` and run the
    /// extractor over the tree.
    pub(crate) fn extract(
        extractor: &dyn ChunkExtractor,
        grammar_key: &str,
        source: &str,
    ) -> Vec<Chunk> {
        let language = mbp_grammars::bundled_language(grammar_key).expect("bundled grammar");
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&language).expect("grammar is loadable");
        let tree = parser.parse(source, None).expect("tree");
        let coords = SourceCoordinates::new(source);
        extractor
            .extract(tree.root_node(), source, &coords, "test-input")
            .expect("extraction succeeds")
    }

    /// First chunk with the given entity name.
    pub(crate) fn find<'a>(chunks: &'a [Chunk], name: &str) -> Option<&'a Chunk> {
        chunks.iter().find(|c| c.entity_name == name)
    }

    /// Assert the universal chunk invariants against the original source.
    pub(crate) fn assert_invariants(chunks: &[Chunk], source: &str) {
        let mut keys = std::collections::HashSet::new();
        for chunk in chunks {
            assert!(chunk.start_byte <= chunk.end_byte);
            assert!(chunk.end_byte <= source.len());
            assert!(chunk.start_line >= 1);
            assert!(chunk.end_line >= chunk.start_line);
            assert_eq!(chunk.content, &source[chunk.start_byte..chunk.end_byte]);
            assert!(
                keys.insert((
                    chunk.entity_name.clone(),
                    chunk.start_byte,
                    chunk.end_byte
                )),
                "duplicate chunk {}",
                chunk.entity_name
            );
        }
    }
}
