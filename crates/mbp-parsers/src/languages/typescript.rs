//! TypeScript chunk extractor: classes, interfaces, type aliases and
//! callables.

use crate::extractor::{
    ChunkExtractor, ChunkSink, field_text, join_qualified, named_children, node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct TypeScriptExtractor;

impl ChunkExtractor for TypeScriptExtractor {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn extract(
        &self,
        root: Node<'_>,
        source: &str,
        coords: &SourceCoordinates,
        source_file: &str,
    ) -> Result<Vec<Chunk>> {
        let mut sink = ChunkSink::new(self.language(), source, coords, source_file);
        let mut classes = Vec::new();
        walk(root, source, &mut classes, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

fn walk(
    node: Node<'_>,
    source: &str,
    classes: &mut Vec<String>,
    sink: &mut ChunkSink<'_>,
) -> Result<()> {
    match node.kind() {
        "class_declaration" | "abstract_class_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                if let Some(params) = field_text(node, "type_parameters", source) {
                    attributes.insert("type_parameters".to_string(), params.to_string());
                }
                if let Some(heritage) = heritage_of(node, source) {
                    attributes.insert("heritage".to_string(), heritage);
                }
                sink.emit(
                    EntityType::Class,
                    &qualified(classes, name),
                    node,
                    &attributes,
                )?;

                classes.push(name.to_string());
                for child in named_children(node) {
                    walk(child, source, classes, sink)?;
                }
                classes.pop();
                return Ok(());
            }
        }
        "interface_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                if let Some(params) = field_text(node, "type_parameters", source) {
                    attributes.insert("type_parameters".to_string(), params.to_string());
                }
                if let Some(heritage) = heritage_of(node, source) {
                    attributes.insert("heritage".to_string(), heritage);
                }
                sink.emit(
                    EntityType::Interface,
                    &qualified(classes, name),
                    node,
                    &attributes,
                )?;

                classes.push(name.to_string());
                for child in named_children(node) {
                    walk(child, source, classes, sink)?;
                }
                classes.pop();
                return Ok(());
            }
        }
        "type_alias_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                if let Some(value) = field_text(node, "value", source) {
                    attributes.insert("value".to_string(), value.to_string());
                }
                sink.emit(
                    EntityType::TypeAlias,
                    &qualified(classes, name),
                    node,
                    &attributes,
                )?;
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let entity_type = if classes.is_empty() {
                    EntityType::Function
                } else {
                    EntityType::Method
                };
                let attributes = callable_attributes(node, source);
                sink.emit(entity_type, &qualified(classes, name), node, &attributes)?;
            }
        }
        "method_definition" | "method_signature" => {
            if let Some(name) = field_text(node, "name", source) {
                let attributes = callable_attributes(node, source);
                sink.emit(
                    EntityType::Method,
                    &qualified(classes, name),
                    node,
                    &attributes,
                )?;
            }
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, classes, sink)?;
    }
    Ok(())
}

fn qualified(classes: &[String], leaf: &str) -> String {
    let mut parts: Vec<&str> = classes.iter().map(String::as_str).collect();
    parts.push(leaf);
    join_qualified(&parts, ".")
}

/// Extends/implements clause text, without the leading keyword.
fn heritage_of(node: Node<'_>, source: &str) -> Option<String> {
    let heritage = named_children(node).into_iter().find(|c| {
        matches!(
            c.kind(),
            "class_heritage" | "extends_type_clause" | "implements_clause"
        )
    })?;
    let text = node_text(heritage, source);
    Some(text.trim_start_matches("extends").trim().to_string())
}

fn callable_attributes(node: Node<'_>, source: &str) -> IndexMap<String, String> {
    let mut attributes = IndexMap::new();
    if let Some(params) = field_text(node, "type_parameters", source) {
        attributes.insert("type_parameters".to_string(), params.to_string());
    }
    if let Some(params) = field_text(node, "parameters", source) {
        attributes.insert("parameters".to_string(), params.to_string());
    }
    if let Some(ret) = field_text(node, "return_type", source) {
        attributes.insert(
            "return_type".to_string(),
            ret.trim_start_matches(':').trim().to_string(),
        );
    }
    attributes.insert("async".to_string(), is_async(node, source).to_string());
    attributes
}

fn is_async(node: Node<'_>, source: &str) -> bool {
    let bytes = node_text(node, source).as_bytes();
    let head = &bytes[..bytes.len().min(16)];
    String::from_utf8_lossy(head).trim_start().starts_with("async")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    #[test]
    fn interface_class_and_alias() {
        let source = r"
interface Shape {
    area(): number;
}

type Point = { x: number; y: number };

class Circle implements Shape {
    area(): number { return 0; }
}

async function load<T>(url: string): Promise<T> { return fetch(url); }
";
        let chunks = extract(&TypeScriptExtractor, "typescript", source);
        assert_invariants(&chunks, source);

        let shape = find(&chunks, "Shape").unwrap();
        assert_eq!(shape.entity_type, EntityType::Interface);
        // Interface members are methods qualified under the interface
        let area_sig = find(&chunks, "Shape.area").unwrap();
        assert_eq!(area_sig.entity_type, EntityType::Method);

        let point = find(&chunks, "Point").unwrap();
        assert_eq!(point.entity_type, EntityType::TypeAlias);
        assert!(point.attributes["value"].contains("x: number"));

        let circle = find(&chunks, "Circle").unwrap();
        assert_eq!(circle.entity_type, EntityType::Class);

        let load = find(&chunks, "load").unwrap();
        assert_eq!(load.entity_type, EntityType::Function);
        assert_eq!(load.attributes["async"], "true");
        assert!(load.attributes["return_type"].contains("Promise<T>"));
    }

    #[test]
    fn function_inside_class_scope_becomes_method() {
        let source = "class Util { helper() { } }\nfunction solo() { }\n";
        let chunks = extract(&TypeScriptExtractor, "typescript", source);
        assert_eq!(
            find(&chunks, "Util.helper").unwrap().entity_type,
            EntityType::Method
        );
        assert_eq!(find(&chunks, "solo").unwrap().entity_type, EntityType::Function);
    }
}
