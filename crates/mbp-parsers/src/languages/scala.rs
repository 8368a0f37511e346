//! Scala chunk extractor: classes, traits, objects and functions qualified
//! by package and enclosing types.

use crate::extractor::{
    ChunkExtractor, ChunkSink, child_of_kind, field_text, join_qualified, named_children,
    node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct ScalaExtractor;

impl ChunkExtractor for ScalaExtractor {
    fn language(&self) -> &'static str {
        "scala"
    }

    fn extract(
        &self,
        root: Node<'_>,
        source: &str,
        coords: &SourceCoordinates,
        source_file: &str,
    ) -> Result<Vec<Chunk>> {
        let mut sink = ChunkSink::new(self.language(), source, coords, source_file);
        let package = package_of(root, source);
        let mut types = Vec::new();
        walk(root, source, package.as_deref(), &mut types, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

/// First child of the package clause names the package.
fn package_of(root: Node<'_>, source: &str) -> Option<String> {
    let clause = child_of_kind(root, "package_clause")?;
    named_children(clause)
        .first()
        .map(|n| node_text(*n, source).to_string())
}

fn type_entity(kind: &str) -> Option<EntityType> {
    match kind {
        "class_definition" => Some(EntityType::Class),
        "trait_definition" => Some(EntityType::Trait),
        "object_definition" => Some(EntityType::Object),
        "case_class_definition" => Some(EntityType::Class),
        _ => None,
    }
}

fn walk(
    node: Node<'_>,
    source: &str,
    package: Option<&str>,
    types: &mut Vec<String>,
    sink: &mut ChunkSink<'_>,
) -> Result<()> {
    if let Some(entity_type) = type_entity(node.kind()) {
        if let Some(name) = field_text(node, "name", source) {
            let mut attributes = IndexMap::new();
            if let Some(pkg) = package {
                attributes.insert("package".to_string(), pkg.to_string());
            }
            if let Some(modifiers) = modifiers_of(node, source) {
                attributes.insert("modifiers".to_string(), modifiers);
            }
            if let Some(params) = field_text(node, "type_parameters", source) {
                attributes.insert("type_parameters".to_string(), params.to_string());
            }
            if let Some(extends) = child_of_kind(node, "extends_clause") {
                attributes.insert(
                    "extends".to_string(),
                    node_text(extends, source)
                        .trim_start_matches("extends")
                        .trim()
                        .to_string(),
                );
            }
            if !types.is_empty() {
                attributes.insert("enclosing_type".to_string(), types.join("."));
            }
            sink.emit(entity_type, &qualified(package, types, name), node, &attributes)?;

            types.push(name.to_string());
            for child in named_children(node) {
                walk(child, source, package, types, sink)?;
            }
            types.pop();
        }
        return Ok(());
    }

    // Abstract members parse as declarations, concrete ones as definitions
    if matches!(node.kind(), "function_definition" | "function_declaration") {
        if let Some(name) = field_text(node, "name", source) {
            let mut attributes = IndexMap::new();
            if let Some(pkg) = package {
                attributes.insert("package".to_string(), pkg.to_string());
            }
            if let Some(modifiers) = modifiers_of(node, source) {
                attributes.insert("modifiers".to_string(), modifiers);
            }
            if !types.is_empty() {
                attributes.insert("enclosing_type".to_string(), types.join("."));
            }
            if let Some(params) = field_text(node, "parameters", source) {
                attributes.insert("parameters".to_string(), params.to_string());
            }
            if let Some(ret) = field_text(node, "return_type", source) {
                attributes.insert("return_type".to_string(), ret.to_string());
            }
            let entity_type = if types.is_empty() {
                EntityType::Function
            } else {
                EntityType::Method
            };
            sink.emit(entity_type, &qualified(package, types, name), node, &attributes)?;
        }
    }

    for child in named_children(node) {
        walk(child, source, package, types, sink)?;
    }
    Ok(())
}

fn modifiers_of(node: Node<'_>, source: &str) -> Option<String> {
    child_of_kind(node, "modifiers").map(|m| {
        node_text(m, source)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn qualified(package: Option<&str>, types: &[String], leaf: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(pkg) = package {
        parts.push(pkg);
    }
    parts.extend(types.iter().map(String::as_str));
    parts.push(leaf);
    join_qualified(&parts, ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    const SOURCE: &str = r"
package billing

trait Gateway {
  def charge(amount: Long): Boolean
}

class Processor(limit: Long) extends Gateway {
  def charge(amount: Long): Boolean = amount < limit
}

case class Receipt(id: String)

object Processor {
  def default: Processor = new Processor(100)
}
";

    #[test]
    fn package_qualified_types_and_methods() {
        let chunks = extract(&ScalaExtractor, "scala", SOURCE);
        assert_invariants(&chunks, SOURCE);

        let gateway = find(&chunks, "billing.Gateway").unwrap();
        assert_eq!(gateway.entity_type, EntityType::Trait);
        assert_eq!(gateway.attributes["package"], "billing");

        let processor = find(&chunks, "billing.Processor").unwrap();
        assert!(processor.attributes["extends"].contains("Gateway"));

        let charge = find(&chunks, "billing.Processor.charge").unwrap();
        assert_eq!(charge.entity_type, EntityType::Method);
        assert!(charge.attributes["parameters"].contains("amount"));

        let receipt = find(&chunks, "billing.Receipt").unwrap();
        assert_eq!(receipt.entity_type, EntityType::Class);

        // Companion object shares the class name but has its own range
        let object_chunk = chunks
            .iter()
            .find(|c| c.entity_name == "billing.Processor" && c.entity_type == EntityType::Object);
        assert!(object_chunk.is_some());
    }
}
