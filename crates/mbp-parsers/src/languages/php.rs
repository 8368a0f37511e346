//! PHP chunk extractor: namespace-qualified classes, interfaces, traits,
//! enums, functions and methods.

use crate::extractor::{
    ChunkExtractor, ChunkSink, child_of_kind, field_text, join_qualified, named_children,
    node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct PhpExtractor;

impl ChunkExtractor for PhpExtractor {
    fn language(&self) -> &'static str {
        "php"
    }

    fn extract(
        &self,
        root: Node<'_>,
        source: &str,
        coords: &SourceCoordinates,
        source_file: &str,
    ) -> Result<Vec<Chunk>> {
        let mut sink = ChunkSink::new(self.language(), source, coords, source_file);
        let mut scope = Scope::default();
        walk(root, source, &mut scope, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

#[derive(Default)]
struct Scope {
    namespace: Option<String>,
    types: Vec<String>,
}

impl Scope {
    /// PHP qualifies with backslashes: `App\Db\Connection::class`.
    fn qualify(&self, leaf: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(ns) = &self.namespace {
            parts.push(ns);
        }
        parts.extend(self.types.iter().map(String::as_str));
        parts.push(leaf);
        join_qualified(&parts, "\\")
    }
}

fn type_entity(kind: &str) -> Option<EntityType> {
    match kind {
        "class_declaration" => Some(EntityType::Class),
        "interface_declaration" => Some(EntityType::Interface),
        "trait_declaration" => Some(EntityType::Trait),
        "enum_declaration" => Some(EntityType::Enum),
        _ => None,
    }
}

fn walk(node: Node<'_>, source: &str, scope: &mut Scope, sink: &mut ChunkSink<'_>) -> Result<()> {
    if node.kind() == "namespace_definition" {
        if let Some(name) = field_text(node, "name", source) {
            scope.namespace = Some(name.to_string());
        }
        for child in named_children(node) {
            walk(child, source, scope, sink)?;
        }
        return Ok(());
    }

    if let Some(entity_type) = type_entity(node.kind()) {
        if let Some(name) = field_text(node, "name", source) {
            let mut attributes = IndexMap::new();
            if let Some(ns) = &scope.namespace {
                attributes.insert("namespace".to_string(), ns.clone());
            }
            if let Some(base) = child_of_kind(node, "base_clause") {
                attributes.insert(
                    "extends".to_string(),
                    node_text(base, source)
                        .trim_start_matches("extends")
                        .trim()
                        .to_string(),
                );
            }
            if let Some(interfaces) = child_of_kind(node, "class_interface_clause") {
                attributes.insert(
                    "implements".to_string(),
                    node_text(interfaces, source)
                        .trim_start_matches("implements")
                        .trim()
                        .to_string(),
                );
            }
            sink.emit(entity_type, &scope.qualify(name), node, &attributes)?;

            scope.types.push(name.to_string());
            for child in named_children(node) {
                walk(child, source, scope, sink)?;
            }
            scope.types.pop();
        }
        return Ok(());
    }

    match node.kind() {
        "function_definition" | "method_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let entity_type = if node.kind() == "method_declaration" {
                    EntityType::Method
                } else {
                    EntityType::Function
                };
                let mut attributes = IndexMap::new();
                if let Some(ns) = &scope.namespace {
                    attributes.insert("namespace".to_string(), ns.clone());
                }
                if let Some(modifiers) = modifiers_of(node, source) {
                    attributes.insert("modifiers".to_string(), modifiers);
                }
                if let Some(params) = field_text(node, "parameters", source) {
                    attributes.insert("parameters".to_string(), params.to_string());
                }
                if let Some(ret) = field_text(node, "return_type", source) {
                    attributes.insert("return_type".to_string(), ret.to_string());
                }
                sink.emit(entity_type, &scope.qualify(name), node, &attributes)?;
            }
        }
        _ => {}
    }

    for child in named_children(node) {
        walk(child, source, scope, sink)?;
    }
    Ok(())
}

fn modifiers_of(node: Node<'_>, source: &str) -> Option<String> {
    let modifiers: Vec<&str> = named_children(node)
        .into_iter()
        .filter(|c| {
            matches!(
                c.kind(),
                "visibility_modifier" | "static_modifier" | "abstract_modifier" | "final_modifier"
            )
        })
        .map(|c| node_text(c, source))
        .collect();
    if modifiers.is_empty() {
        None
    } else {
        Some(modifiers.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    const SOURCE: &str = r"<?php
namespace App\Db;

interface Driver {
    public function connect(): bool;
}

class Connection extends Base implements Driver {
    public function connect(): bool { return true; }
    private static function reset() { }
}

function helper($arg) { return $arg; }
";

    #[test]
    fn namespaced_types_and_members() {
        let chunks = extract(&PhpExtractor, "php", SOURCE);
        assert_invariants(&chunks, SOURCE);

        let driver = find(&chunks, "App\\Db\\Driver").unwrap();
        assert_eq!(driver.entity_type, EntityType::Interface);
        assert_eq!(driver.attributes["namespace"], "App\\Db");

        let conn = find(&chunks, "App\\Db\\Connection").unwrap();
        assert_eq!(conn.entity_type, EntityType::Class);
        assert_eq!(conn.attributes["extends"], "Base");
        assert!(conn.attributes["implements"].contains("Driver"));

        let connect = find(&chunks, "App\\Db\\Connection\\connect").unwrap();
        assert_eq!(connect.entity_type, EntityType::Method);
        assert!(connect.attributes["modifiers"].contains("public"));
        assert!(connect.attributes["return_type"].contains("bool"));

        let reset = find(&chunks, "App\\Db\\Connection\\reset").unwrap();
        assert!(reset.attributes["modifiers"].contains("static"));

        let helper = find(&chunks, "App\\Db\\helper").unwrap();
        assert_eq!(helper.entity_type, EntityType::Function);
        assert!(helper.attributes["parameters"].contains("$arg"));
    }
}
