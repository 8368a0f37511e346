//! C chunk extractor: struct definitions and function definitions.

use crate::extractor::{
    ChunkExtractor, ChunkSink, field_text, named_children, node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct CExtractor;

impl ChunkExtractor for CExtractor {
    fn language(&self) -> &'static str {
        "c"
    }

    fn extract(
        &self,
        root: Node<'_>,
        source: &str,
        coords: &SourceCoordinates,
        source_file: &str,
    ) -> Result<Vec<Chunk>> {
        let mut sink = ChunkSink::new(self.language(), source, coords, source_file);
        walk(root, source, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

fn walk(node: Node<'_>, source: &str, sink: &mut ChunkSink<'_>) -> Result<()> {
    match node.kind() {
        "struct_specifier" => {
            // Named definitions only; bare `struct Foo x;` references are
            // not chunks
            if node.child_by_field_name("body").is_some()
                && let Some(name) = field_text(node, "name", source)
            {
                sink.emit(EntityType::Struct, name, node, &IndexMap::new())?;
            }
        }
        "function_definition" => {
            if let Some(name) = declarator_identifier(node, source) {
                let mut attributes = IndexMap::new();
                attributes.insert("signature".to_string(), signature_of(node, source));
                if let Some(params) = parameters_of(node, source) {
                    attributes.insert("parameters".to_string(), params);
                }
                if let Some(ret) = field_text(node, "type", source) {
                    attributes.insert("return_type".to_string(), ret.to_string());
                }
                sink.emit(EntityType::Function, &name, node, &attributes)?;
            }
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, sink)?;
    }
    Ok(())
}

/// Innermost identifier of a (possibly pointer-wrapped) declarator.
fn declarator_identifier(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" => {
                return Some(node_text(current, source).to_string());
            }
            _ => current = current.child_by_field_name("declarator")?,
        }
    }
}

/// Parenthesized parameter list of the function declarator.
fn parameters_of(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        if current.kind() == "function_declarator" {
            return current
                .child_by_field_name("parameters")
                .map(|p| node_text(p, source).to_string());
        }
        current = current.child_by_field_name("declarator")?;
    }
}

/// `return_type declarator`, e.g. `int add(int a, int b)`.
fn signature_of(node: Node<'_>, source: &str) -> String {
    let ret = field_text(node, "type", source).unwrap_or_default();
    let decl = field_text(node, "declarator", source).unwrap_or_default();
    format!("{ret} {decl}").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    #[test]
    fn typedef_struct_and_function() {
        let source =
            "typedef struct Foo { int x; } Foo;\nint add(int a, int b) { return a + b; }\n";
        let chunks = extract(&CExtractor, "c", source);
        assert_invariants(&chunks, source);

        let foo = find(&chunks, "Foo").unwrap();
        assert_eq!(foo.entity_type, EntityType::Struct);

        let add = find(&chunks, "add").unwrap();
        assert_eq!(add.entity_type, EntityType::Function);
        assert!(add.attributes["parameters"].contains("(int a, int b)"));
        assert_eq!(add.attributes["return_type"], "int");
        assert_eq!(add.attributes["signature"], "int add(int a, int b)");
    }

    #[test]
    fn pointer_returning_function() {
        let source = "char *dup(const char *s) { return 0; }\n";
        let chunks = extract(&CExtractor, "c", source);
        let dup = find(&chunks, "dup").unwrap();
        assert_eq!(dup.attributes["return_type"], "char");
        assert!(dup.attributes["parameters"].contains("const char *s"));
    }

    #[test]
    fn struct_reference_is_not_a_chunk() {
        let source = "struct Foo; struct Foo make(void) { struct Foo f; return f; }\n";
        let chunks = extract(&CExtractor, "c", source);
        assert!(find(&chunks, "Foo").is_none());
        assert!(find(&chunks, "make").is_some());
    }
}
