//! Python chunk extractor: classes and functions with decorator, docstring
//! and async metadata.

use crate::extractor::{
    ChunkExtractor, ChunkSink, all_children, field_text, join_qualified, named_children,
    node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct PythonExtractor;

impl ChunkExtractor for PythonExtractor {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extract(
        &self,
        root: Node<'_>,
        source: &str,
        coords: &SourceCoordinates,
        source_file: &str,
    ) -> Result<Vec<Chunk>> {
        let mut sink = ChunkSink::new(self.language(), source, coords, source_file);
        let mut scopes = Vec::new();
        walk(root, source, &mut scopes, &[], &mut sink)?;
        Ok(sink.into_chunks())
    }
}

fn walk(
    node: Node<'_>,
    source: &str,
    scopes: &mut Vec<String>,
    decorators: &[String],
    sink: &mut ChunkSink<'_>,
) -> Result<()> {
    match node.kind() {
        "decorated_definition" => {
            // Decorators wrap the definition; hand them down to the
            // wrapped def
            let collected: Vec<String> = named_children(node)
                .into_iter()
                .filter(|c| c.kind() == "decorator")
                .map(|c| node_text(c, source).trim().to_string())
                .collect();
            if let Some(definition) = node.child_by_field_name("definition") {
                walk(definition, source, scopes, &collected, sink)?;
            }
            return Ok(());
        }
        "class_definition" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                if let Some(bases) = field_text(node, "superclasses", source) {
                    attributes.insert("bases".to_string(), bases.to_string());
                }
                if !decorators.is_empty() {
                    attributes.insert("decorators".to_string(), decorators.join(","));
                }
                if let Some(doc) = docstring_of(node, source) {
                    attributes.insert("docstring".to_string(), doc);
                }
                sink.emit(EntityType::Class, &qualified(scopes, name), node, &attributes)?;

                scopes.push(name.to_string());
                for child in named_children(node) {
                    walk(child, source, scopes, &[], sink)?;
                }
                scopes.pop();
                return Ok(());
            }
        }
        "function_definition" | "async_function_definition" => {
            if let Some(name) = field_text(node, "name", source) {
                let is_async =
                    node.kind() == "async_function_definition" || has_async_keyword(node);
                let mut attributes = IndexMap::new();
                attributes.insert("async".to_string(), is_async.to_string());
                if let Some(params) = field_text(node, "parameters", source) {
                    attributes.insert("parameters".to_string(), params.to_string());
                }
                if let Some(ret) = field_text(node, "return_type", source) {
                    attributes.insert("return_type".to_string(), ret.to_string());
                }
                if !decorators.is_empty() {
                    attributes.insert("decorators".to_string(), decorators.join(","));
                }
                if let Some(doc) = docstring_of(node, source) {
                    attributes.insert("docstring".to_string(), doc);
                }
                sink.emit(
                    EntityType::Function,
                    &qualified(scopes, name),
                    node,
                    &attributes,
                )?;

                // Nested defs qualify under this function
                scopes.push(name.to_string());
                for child in named_children(node) {
                    walk(child, source, scopes, &[], sink)?;
                }
                scopes.pop();
                return Ok(());
            }
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, scopes, &[], sink)?;
    }
    Ok(())
}

fn qualified(scopes: &[String], leaf: &str) -> String {
    let mut parts: Vec<&str> = scopes.iter().map(String::as_str).collect();
    parts.push(leaf);
    join_qualified(&parts, ".")
}

fn has_async_keyword(node: Node<'_>) -> bool {
    all_children(node).iter().any(|c| c.kind() == "async")
}

/// First statement of the body when it is a bare string expression.
fn docstring_of(node: Node<'_>, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = named_children(body).into_iter().next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let inner = named_children(first).into_iter().next()?;
    if inner.kind() == "string" {
        Some(node_text(inner, source).to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    #[test]
    fn decorated_async_function_with_docstring() {
        let source = "@cache\nasync def fetch(url: str) -> bytes:\n    \"\"\"Fetch bytes.\"\"\"\n    ...\n";
        let chunks = extract(&PythonExtractor, "python", source);
        assert_invariants(&chunks, source);

        let fetch = find(&chunks, "fetch").unwrap();
        assert_eq!(fetch.entity_type, EntityType::Function);
        assert_eq!(fetch.attributes["async"], "true");
        assert_eq!(fetch.attributes["decorators"], "@cache");
        assert_eq!(fetch.attributes["docstring"], "\"\"\"Fetch bytes.\"\"\"");
        assert!(fetch.attributes["parameters"].contains("url: str"));
        assert_eq!(fetch.attributes["return_type"], "bytes");
    }

    #[test]
    fn nested_class_and_method_names() {
        let source = r#"
class A:
    class B:
        def m(self):
            pass

    def top(self):
        pass

def free():
    pass
"#;
        let chunks = extract(&PythonExtractor, "python", source);
        assert_invariants(&chunks, source);

        assert!(find(&chunks, "A").is_some());
        assert!(find(&chunks, "A.B").is_some());
        assert!(find(&chunks, "A.B.m").is_some());
        assert!(find(&chunks, "A.top").is_some());
        assert_eq!(find(&chunks, "free").unwrap().attributes["async"], "false");
    }

    #[test]
    fn class_docstring_and_bases() {
        let source = "class Child(Base):\n    \"\"\"A child.\"\"\"\n    pass\n";
        let chunks = extract(&PythonExtractor, "python", source);
        let child = find(&chunks, "Child").unwrap();
        assert_eq!(child.attributes["bases"], "(Base)");
        assert_eq!(child.attributes["docstring"], "\"\"\"A child.\"\"\"");
    }

    #[test]
    fn sync_function_is_not_async() {
        let source = "def plain():\n    return 1\n";
        let chunks = extract(&PythonExtractor, "python", source);
        assert_eq!(find(&chunks, "plain").unwrap().attributes["async"], "false");
    }
}
