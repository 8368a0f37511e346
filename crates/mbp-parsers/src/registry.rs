//! Extension-to-parser registry, the ingestion entry point.

use crate::java_ast::JavaAstParser;
use crate::languages;
use crate::parser::{SourceParser, TreeSitterParser};
use mbp_domain::{Chunk, Result};
use mbp_grammars::{GrammarManager, builtin_spec};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Maps lowercased file extensions to parser instances.
///
/// Multiple extensions can map to one parser; when two parsers claim the
/// same extension the last registration wins, which is an explicit
/// configuration concern (`.h` is claimed by both C and C++).
#[derive(Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn SourceParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in parser wired to `manager`.
    ///
    /// `.java` is owned by the built-in Java parser; the Tree-sitter Java
    /// parser is still constructible via [`languages`] for consumers that
    /// want `.`-qualified member names.
    pub fn with_default_parsers(manager: &Arc<GrammarManager>) -> Self {
        let mut registry = Self::new();
        for parser in languages::default_parsers(manager) {
            registry.register(parser);
        }
        // Last registration wins for contested extensions
        registry.register(Arc::new(JavaAstParser::new()));
        registry
    }

    /// Register a parser under every extension it claims.
    pub fn register(&mut self, parser: Arc<dyn SourceParser>) {
        for ext in parser.extensions() {
            let key = ext.to_lowercase();
            debug!(language = parser.language(), extension = %key, "registered parser");
            self.parsers.insert(key, Arc::clone(&parser));
        }
    }

    /// Parser claiming the path's extension, if any.
    pub fn parser_for(&self, path: &Path) -> Option<Arc<dyn SourceParser>> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        let ext = name.rfind('.').map(|i| &name[i..])?;
        self.parsers.get(ext).cloned()
    }

    /// Parse one file with its registered parser; unsupported extensions
    /// yield an empty list.
    pub fn parse(&self, path: &Path) -> Result<Vec<Chunk>> {
        match self.parser_for(path) {
            Some(parser) => parser.parse(path),
            None => Ok(Vec::new()),
        }
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.parsers.keys().cloned().collect();
        exts.sort();
        exts
    }
}

/// Convenience: a registry over a default grammar manager.
pub fn default_registry() -> ParserRegistry {
    let manager = Arc::new(GrammarManager::new());
    ParserRegistry::with_default_parsers(&manager)
}

/// Tree-sitter Java parser for consumers preferring `.`-qualified names.
pub fn java_tree_sitter_parser(manager: &Arc<GrammarManager>) -> Arc<dyn SourceParser> {
    let spec = builtin_spec("java").expect("built-in java spec");
    Arc::new(TreeSitterParser::new(
        spec,
        manager,
        Box::new(languages::java::JavaExtractor),
        &[".java"],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_yields_empty() {
        let registry = default_registry();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "not code").unwrap();
        assert!(registry.parse(&path).unwrap().is_empty());
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        let registry = default_registry();
        assert!(registry.parser_for(Path::new("Main.PY")).is_some());
        assert!(registry.parser_for(Path::new("main.py")).is_some());
        assert!(registry.parser_for(Path::new("README")).is_none());
    }

    #[test]
    fn dot_h_ties_resolve_to_last_registration() {
        let registry = default_registry();
        let parser = registry.parser_for(Path::new("util.h")).unwrap();
        assert_eq!(parser.language(), "cpp");
    }

    #[test]
    fn dot_java_is_owned_by_the_builtin_parser() {
        let registry = default_registry();
        let parser = registry.parser_for(Path::new("Main.java")).unwrap();
        assert_eq!(parser.language(), "java");
        // The built-in parser qualifies members with '#'
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Main.java");
        std::fs::write(&path, "class Main { void run() {} }").unwrap();
        let chunks = parser.parse(&path).unwrap();
        assert!(chunks.iter().any(|c| c.entity_name == "Main#run()"));
    }
}
