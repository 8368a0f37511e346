//! Swift chunk extractor: classes, structs, enums, protocols, extensions
//! and functions.

use crate::extractor::{
    ChunkExtractor, ChunkSink, all_children, child_of_kind, field_text, join_qualified,
    named_children, node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct SwiftExtractor;

impl ChunkExtractor for SwiftExtractor {
    fn language(&self) -> &'static str {
        "swift"
    }

    fn extract(
        &self,
        root: Node<'_>,
        source: &str,
        coords: &SourceCoordinates,
        source_file: &str,
    ) -> Result<Vec<Chunk>> {
        let mut sink = ChunkSink::new(self.language(), source, coords, source_file);
        let mut types = Vec::new();
        walk(root, source, &mut types, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

fn walk(
    node: Node<'_>,
    source: &str,
    types: &mut Vec<String>,
    sink: &mut ChunkSink<'_>,
) -> Result<()> {
    match node.kind() {
        // The grammar folds class/struct/enum/extension into one node kind;
        // the leading keyword decides the entity
        "class_declaration" | "struct_declaration" | "enum_declaration"
        | "extension_declaration" | "protocol_declaration" => {
            let entity_type = classify(node);
            let name = declared_name(node, source);
            let Some(name) = name else {
                // An extension without a nameable target is dropped
                return Ok(());
            };

            let mut attributes = IndexMap::new();
            if let Some(generics) = field_text(node, "type_parameters", source)
                .or_else(|| child_of_kind(node, "type_parameters").map(|n| node_text(n, source)))
            {
                attributes.insert("generic_parameters".to_string(), generics.to_string());
            }
            if let Some(inheritance) = inheritance_of(node, source) {
                attributes.insert("inheritance".to_string(), inheritance);
            }
            if let Some(modifiers) = modifiers_of(node, source) {
                attributes.insert("modifiers".to_string(), modifiers);
            }
            if !types.is_empty() {
                attributes.insert("enclosing_type".to_string(), types.join("."));
            }
            if entity_type == EntityType::Extension {
                attributes.insert("extended_type".to_string(), name.clone());
            }
            sink.emit(entity_type, &qualified(types, &name), node, &attributes)?;

            types.push(name);
            for child in named_children(node) {
                walk(child, source, types, sink)?;
            }
            types.pop();
            return Ok(());
        }
        "function_declaration" => {
            if let Some(name) = declared_name(node, source) {
                let entity_type = if types.is_empty() {
                    EntityType::Function
                } else {
                    EntityType::Method
                };
                let mut attributes = IndexMap::new();
                if let Some(modifiers) = modifiers_of(node, source) {
                    attributes.insert("modifiers".to_string(), modifiers);
                }
                if !types.is_empty() {
                    attributes.insert("enclosing_type".to_string(), types.join("."));
                }
                if let Some(params) = parameters_of(node, source) {
                    attributes.insert("parameters".to_string(), params);
                }
                if let Some(ret) = field_text(node, "return_type", source) {
                    attributes.insert("return_type".to_string(), ret.to_string());
                }
                sink.emit(entity_type, &qualified(types, &name), node, &attributes)?;
            }
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, types, sink)?;
    }
    Ok(())
}

/// Entity kind from the declaration's leading keyword.
fn classify(node: Node<'_>) -> EntityType {
    if node.kind() == "protocol_declaration" {
        return EntityType::Protocol;
    }
    for child in all_children(node) {
        match child.kind() {
            "class" => return EntityType::Class,
            "struct" => return EntityType::Struct,
            "enum" => return EntityType::Enum,
            "extension" => return EntityType::Extension,
            "protocol" => return EntityType::Protocol,
            _ => {}
        }
    }
    match node.kind() {
        "struct_declaration" => EntityType::Struct,
        "enum_declaration" => EntityType::Enum,
        "extension_declaration" => EntityType::Extension,
        _ => EntityType::Class,
    }
}

/// Declared or extended type name.
fn declared_name(node: Node<'_>, source: &str) -> Option<String> {
    if let Some(name) = field_text(node, "name", source) {
        return Some(name.trim().to_string());
    }
    named_children(node)
        .into_iter()
        .find(|c| {
            matches!(
                c.kind(),
                "type_identifier" | "simple_identifier" | "user_type" | "identifier"
            )
        })
        .map(|c| node_text(c, source).trim().to_string())
}

/// `: Base, Proto` inheritance clause without the colon.
fn inheritance_of(node: Node<'_>, source: &str) -> Option<String> {
    let clause = named_children(node).into_iter().find(|c| {
        matches!(
            c.kind(),
            "inheritance_specifier" | "type_inheritance_clause" | "inheritance_clause"
        )
    })?;
    Some(
        node_text(clause, source)
            .trim_start_matches(':')
            .trim()
            .to_string(),
    )
}

fn modifiers_of(node: Node<'_>, source: &str) -> Option<String> {
    let modifiers: Vec<&str> = named_children(node)
        .into_iter()
        .filter(|c| matches!(c.kind(), "modifiers" | "visibility_modifier" | "property_modifier"))
        .map(|c| node_text(c, source))
        .collect();
    if modifiers.is_empty() {
        None
    } else {
        Some(modifiers.join(" "))
    }
}

fn parameters_of(node: Node<'_>, source: &str) -> Option<String> {
    if let Some(params) = field_text(node, "parameters", source) {
        return Some(params.to_string());
    }
    let params: Vec<String> = named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "parameter")
        .map(|c| node_text(c, source).to_string())
        .collect();
    if params.is_empty() {
        None
    } else {
        Some(format!("({})", params.join(", ")))
    }
}

fn qualified(types: &[String], leaf: &str) -> String {
    let mut parts: Vec<&str> = types.iter().map(String::as_str).collect();
    parts.push(leaf);
    join_qualified(&parts, ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    const SOURCE: &str = r#"
class Animal {
    func speak() -> String {
        return "..."
    }
}

struct Point {
    func zero() -> Point {
        return Point()
    }
}

protocol Greeter {
    func greet() -> String
}

extension Point {
    func flipped() -> Point {
        return Point()
    }
}

func topLevel(x: Int) -> Int {
    return x
}
"#;

    #[test]
    fn classes_structs_protocols_extensions() {
        let chunks = extract(&SwiftExtractor, "swift", SOURCE);
        assert_invariants(&chunks, SOURCE);

        let animal = find(&chunks, "Animal").unwrap();
        assert_eq!(animal.entity_type, EntityType::Class);
        assert_eq!(
            find(&chunks, "Animal.speak").unwrap().entity_type,
            EntityType::Method
        );

        let point = find(&chunks, "Point").unwrap();
        assert_eq!(point.entity_type, EntityType::Struct);

        let greeter = find(&chunks, "Greeter").unwrap();
        assert_eq!(greeter.entity_type, EntityType::Protocol);

        // The extension re-opens Point; its method is qualified underneath
        let flipped = find(&chunks, "Point.flipped").unwrap();
        assert_eq!(flipped.entity_type, EntityType::Method);
        let extension = chunks
            .iter()
            .find(|c| c.entity_type == EntityType::Extension)
            .unwrap();
        assert_eq!(extension.attributes["extended_type"], "Point");

        let top = find(&chunks, "topLevel").unwrap();
        assert_eq!(top.entity_type, EntityType::Function);
        assert!(top.attributes["parameters"].contains("x: Int"));
    }
}
