//! Rust chunk extractor: items qualified by module and impl scope with `::`.

use crate::extractor::{
    ChunkExtractor, ChunkSink, field_text, join_qualified, named_children, node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct RustExtractor;

impl ChunkExtractor for RustExtractor {
    fn language(&self) -> &'static str {
        "rust"
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
    modules: Vec<String>,
    /// Type being implemented, when inside an `impl` block
    impl_types: Vec<String>,
}

impl Scope {
    fn qualify(&self, leaf: &str) -> String {
        let mut parts: Vec<&str> = self.modules.iter().map(String::as_str).collect();
        parts.extend(self.impl_types.iter().map(String::as_str));
        parts.push(leaf);
        join_qualified(&parts, "::")
    }
}

fn walk(node: Node<'_>, source: &str, scope: &mut Scope, sink: &mut ChunkSink<'_>) -> Result<()> {
    match node.kind() {
        "mod_item" => {
            if let Some(name) = field_text(node, "name", source) {
                sink.emit(
                    EntityType::Module,
                    &scope.qualify(name),
                    node,
                    &IndexMap::new(),
                )?;
                scope.modules.push(name.to_string());
                for child in named_children(node) {
                    walk(child, source, scope, sink)?;
                }
                scope.modules.pop();
                return Ok(());
            }
        }
        "impl_item" => {
            // An impl block qualifies its functions but is not itself a chunk
            if let Some(ty) = field_text(node, "type", source) {
                let base = ty.split('<').next().unwrap_or(ty).trim().to_string();
                scope.impl_types.push(base);
                for child in named_children(node) {
                    walk(child, source, scope, sink)?;
                }
                scope.impl_types.pop();
                return Ok(());
            }
        }
        "struct_item" | "enum_item" | "trait_item" => {
            if let Some(name) = field_text(node, "name", source) {
                let entity_type = match node.kind() {
                    "struct_item" => EntityType::Struct,
                    "enum_item" => EntityType::Enum,
                    _ => EntityType::Trait,
                };
                let mut attributes = IndexMap::new();
                if let Some(params) = field_text(node, "type_parameters", source) {
                    attributes.insert("type_parameters".to_string(), params.to_string());
                }
                sink.emit(entity_type, &scope.qualify(name), node, &attributes)?;

                if node.kind() == "trait_item" {
                    scope.impl_types.push(name.to_string());
                    for child in named_children(node) {
                        walk(child, source, scope, sink)?;
                    }
                    scope.impl_types.pop();
                    return Ok(());
                }
            }
        }
        "function_item" | "function_signature_item" => {
            if let Some(name) = field_text(node, "name", source) {
                let entity_type = if scope.impl_types.is_empty() {
                    EntityType::Function
                } else {
                    EntityType::Method
                };
                let mut attributes = IndexMap::new();
                if let Some(params) = field_text(node, "parameters", source) {
                    attributes.insert("parameters".to_string(), params.to_string());
                }
                if let Some(ret) = field_text(node, "return_type", source) {
                    attributes.insert("return_type".to_string(), ret.to_string());
                }
                if !scope.impl_types.is_empty() {
                    attributes.insert(
                        "enclosing_type".to_string(),
                        scope.impl_types.join("::"),
                    );
                }
                sink.emit(entity_type, &scope.qualify(name), node, &attributes)?;
            }
        }
        "type_item" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                if let Some(value) = field_text(node, "type", source) {
                    attributes.insert("value".to_string(), value.to_string());
                }
                sink.emit(EntityType::TypeAlias, &scope.qualify(name), node, &attributes)?;
            }
        }
        "const_item" | "static_item" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = IndexMap::new();
                if let Some(ty) = field_text(node, "type", source) {
                    attributes.insert("type".to_string(), ty.to_string());
                }
                sink.emit(EntityType::Constant, &scope.qualify(name), node, &attributes)?;
            }
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, scope, sink)?;
    }
    Ok(())
}
