//! Ruby chunk extractor: classes, modules, methods and constants with `::`
//! qualification.

use crate::extractor::{
    ChunkExtractor, ChunkSink, field_text, join_qualified, named_children, node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct RubyExtractor;

impl ChunkExtractor for RubyExtractor {
    fn language(&self) -> &'static str {
        "ruby"
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
        walk(root, source, &mut scopes, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

fn walk(
    node: Node<'_>,
    source: &str,
    scopes: &mut Vec<String>,
    sink: &mut ChunkSink<'_>,
) -> Result<()> {
    match node.kind() {
        "class" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                if let Some(superclass) = field_text(node, "superclass", source) {
                    attributes.insert(
                        "superclass".to_string(),
                        superclass.trim_start_matches('<').trim().to_string(),
                    );
                }
                add_enclosing(scopes, &mut attributes);
                sink.emit(EntityType::Class, &qualified(scopes, name), node, &attributes)?;

                scopes.push(name.to_string());
                for child in named_children(node) {
                    walk(child, source, scopes, sink)?;
                }
                scopes.pop();
                return Ok(());
            }
        }
        "module" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                add_enclosing(scopes, &mut attributes);
                sink.emit(EntityType::Module, &qualified(scopes, name), node, &attributes)?;

                scopes.push(name.to_string());
                for child in named_children(node) {
                    walk(child, source, scopes, sink)?;
                }
                scopes.pop();
                return Ok(());
            }
        }
        "singleton_class" => {
            // `class << self` reopens the enclosing scope for class methods
            for child in named_children(node) {
                walk(child, source, scopes, sink)?;
            }
            return Ok(());
        }
        "method" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                add_enclosing(scopes, &mut attributes);
                if let Some(params) = field_text(node, "parameters", source) {
                    attributes.insert("parameters".to_string(), params.to_string());
                }
                sink.emit(EntityType::Method, &qualified(scopes, name), node, &attributes)?;
            }
        }
        "singleton_method" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                add_enclosing(scopes, &mut attributes);
                if let Some(object) = field_text(node, "object", source) {
                    attributes.insert("object".to_string(), object.to_string());
                }
                if let Some(params) = field_text(node, "parameters", source) {
                    attributes.insert("parameters".to_string(), params.to_string());
                }
                sink.emit(
                    EntityType::SingletonMethod,
                    &qualified(scopes, name),
                    node,
                    &attributes,
                )?;
            }
        }
        "assignment" => {
            // Top-of-scope constant assignments are chunks
            if let Some(left) = node.child_by_field_name("left")
                && left.kind() == "constant"
            {
                let name = node_text(left, source);
                let mut attributes = IndexMap::new();
                add_enclosing(scopes, &mut attributes);
                sink.emit(EntityType::Constant, &qualified(scopes, name), node, &attributes)?;
            }
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, scopes, sink)?;
    }
    Ok(())
}

fn qualified(scopes: &[String], leaf: &str) -> String {
    let mut parts: Vec<&str> = scopes.iter().map(String::as_str).collect();
    parts.push(leaf);
    join_qualified(&parts, "::")
}

fn add_enclosing(scopes: &[String], attributes: &mut IndexMap<String, String>) {
    if !scopes.is_empty() {
        attributes.insert("enclosing_type".to_string(), scopes.join("::"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    const SOURCE: &str = r#"
module Billing
  TAX_RATE = 0.2

  class Invoice < Document
    def total(items)
      items.sum
    end

    def self.build(data)
      new
    end
  end
end
"#;

    #[test]
    fn modules_classes_and_methods() {
        let chunks = extract(&RubyExtractor, "ruby", SOURCE);
        assert_invariants(&chunks, SOURCE);

        let module = find(&chunks, "Billing").unwrap();
        assert_eq!(module.entity_type, EntityType::Module);

        let constant = find(&chunks, "Billing::TAX_RATE").unwrap();
        assert_eq!(constant.entity_type, EntityType::Constant);
        assert_eq!(constant.attributes["enclosing_type"], "Billing");

        let class = find(&chunks, "Billing::Invoice").unwrap();
        assert_eq!(class.entity_type, EntityType::Class);
        assert_eq!(class.attributes["superclass"], "Document");

        let total = find(&chunks, "Billing::Invoice::total").unwrap();
        assert_eq!(total.entity_type, EntityType::Method);
        assert!(total.attributes["parameters"].contains("items"));

        let build = find(&chunks, "Billing::Invoice::build").unwrap();
        assert_eq!(build.entity_type, EntityType::SingletonMethod);
        assert_eq!(build.attributes["object"], "self");
    }
}
