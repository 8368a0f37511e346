//! JavaScript chunk extractor: classes, methods and functions.

use crate::extractor::{
    ChunkExtractor, ChunkSink, field_text, join_qualified, named_children, node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct JavaScriptExtractor;

impl ChunkExtractor for JavaScriptExtractor {
    fn language(&self) -> &'static str {
        "javascript"
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
        "class_declaration" | "class" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                if let Some(superclass) = heritage_of(node, source) {
                    attributes.insert("superclass".to_string(), superclass);
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
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                // A function seen inside a class scope is one of its methods
                let entity_type = if classes.is_empty() {
                    EntityType::Function
                } else {
                    EntityType::Method
                };
                let attributes = callable_attributes(node, source);
                sink.emit(entity_type, &qualified(classes, name), node, &attributes)?;
            }
        }
        "method_definition" => {
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

/// Superclass expression from the `extends` clause.
fn heritage_of(node: Node<'_>, source: &str) -> Option<String> {
    let heritage = named_children(node)
        .into_iter()
        .find(|c| c.kind() == "class_heritage")?;
    let text = node_text(heritage, source);
    Some(text.trim_start_matches("extends").trim().to_string())
}

fn callable_attributes(node: Node<'_>, source: &str) -> IndexMap<String, String> {
    let mut attributes = IndexMap::new();
    if let Some(params) = field_text(node, "parameters", source) {
        attributes.insert("parameters".to_string(), params.to_string());
    }
    attributes.insert("async".to_string(), is_async(node, source).to_string());
    attributes
}

/// Async callables start with the `async` keyword; inspecting the leading
/// bytes covers every callable kind at once.
fn is_async(node: Node<'_>, source: &str) -> bool {
    let bytes = node_text(node, source).as_bytes();
    let head = &bytes[..bytes.len().min(16)];
    String::from_utf8_lossy(head).trim_start().starts_with("async")
}
