//! Kotlin chunk extractor: classes, objects, functions and properties.

use crate::extractor::{
    ChunkExtractor, ChunkSink, all_children, child_of_kind, field_text, join_qualified,
    named_children, node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct KotlinExtractor;

impl ChunkExtractor for KotlinExtractor {
    fn language(&self) -> &'static str {
        "kotlin"
    }

    fn extract(
        &self,
        root: Node<'_>,
        source: &str,
        coords: &SourceCoordinates,
        source_file: &str,
    ) -> Result<Vec<Chunk>> {
        let mut sink = ChunkSink::new(self.language(), source, coords, source_file);
        let context = FileContext::from_root(root, source);
        let mut types = Vec::new();
        walk(root, source, &context, &mut types, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

struct FileContext {
    package: Option<String>,
    imports: Option<String>,
}

impl FileContext {
    fn from_root(root: Node<'_>, source: &str) -> Self {
        let mut package = None;
        let mut imports = Vec::new();
        for child in named_children(root) {
            match child.kind() {
                "package_header" => {
                    package = named_children(child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "identifier" | "qualified_identifier"))
                        .map(|n| node_text(n, source).trim().to_string());
                }
                "import_list" => {
                    for import in named_children(child) {
                        if let Some(target) = named_children(import)
                            .into_iter()
                            .find(|n| matches!(n.kind(), "identifier" | "qualified_identifier"))
                        {
                            imports.push(node_text(target, source).trim().to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        Self {
            package,
            imports: if imports.is_empty() {
                None
            } else {
                Some(imports.join(","))
            },
        }
    }
}

fn walk(
    node: Node<'_>,
    source: &str,
    context: &FileContext,
    types: &mut Vec<String>,
    sink: &mut ChunkSink<'_>,
) -> Result<()> {
    match node.kind() {
        "class_declaration" | "object_declaration" => {
            if let Some(name) = declared_name(node, source) {
                let modifiers = modifiers_text(node, source);
                let entity_type = classify(node, modifiers.as_deref());
                let mut attributes = base_attributes(context);
                if let Some(modifiers) = &modifiers {
                    attributes.insert("modifiers".to_string(), modifiers.clone());
                }
                if !types.is_empty() {
                    attributes.insert("enclosing_type".to_string(), qualified(context, types, ""));
                }
                sink.emit(entity_type, &qualified(context, types, &name), node, &attributes)?;

                types.push(name);
                for child in named_children(node) {
                    walk(child, source, context, types, sink)?;
                }
                types.pop();
                return Ok(());
            }
        }
        "function_declaration" => {
            if let Some(name) = declared_name(node, source) {
                let mut attributes = base_attributes(context);
                if let Some(modifiers) = modifiers_text(node, source) {
                    attributes.insert("modifiers".to_string(), modifiers);
                }
                if !types.is_empty() {
                    attributes.insert("enclosing_type".to_string(), qualified(context, types, ""));
                }
                if let Some(params) = field_text(node, "parameters", source)
                    .or_else(|| {
                        child_of_kind(node, "function_value_parameters")
                            .map(|n| node_text(n, source))
                    })
                {
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
                sink.emit(entity_type, &qualified(context, types, &name), node, &attributes)?;
            }
        }
        "property_declaration" => {
            if let Some(name) = property_name(node, source) {
                let mut attributes = base_attributes(context);
                if let Some(modifiers) = modifiers_text(node, source) {
                    attributes.insert("modifiers".to_string(), modifiers);
                }
                if !types.is_empty() {
                    attributes.insert("enclosing_type".to_string(), qualified(context, types, ""));
                }
                if let Some(ty) = field_text(node, "type", source) {
                    attributes.insert("type".to_string(), ty.to_string());
                }
                sink.emit(
                    EntityType::Property,
                    &qualified(context, types, &name),
                    node,
                    &attributes,
                )?;
            }
            return Ok(());
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, context, types, sink)?;
    }
    Ok(())
}

/// Entity kind from the declaration's keywords and modifiers.
fn classify(node: Node<'_>, modifiers: Option<&str>) -> EntityType {
    if node.kind() == "object_declaration" {
        return EntityType::Object;
    }
    let modifiers = modifiers.unwrap_or_default();
    if modifiers.split_whitespace().any(|m| m == "data") {
        return EntityType::DataClass;
    }
    if modifiers.split_whitespace().any(|m| m == "sealed") {
        return EntityType::SealedClass;
    }
    if modifiers.split_whitespace().any(|m| m == "enum") {
        return EntityType::Enum;
    }
    if modifiers.split_whitespace().any(|m| m == "annotation") {
        return EntityType::Annotation;
    }
    if has_keyword(node, "interface") {
        return EntityType::Interface;
    }
    EntityType::Class
}

fn has_keyword(node: Node<'_>, keyword: &str) -> bool {
    all_children(node).iter().any(|c| c.kind() == keyword)
}

/// Declared name: the `name` field when the grammar provides one, else the
/// first identifier-like child.
fn declared_name(node: Node<'_>, source: &str) -> Option<String> {
    if let Some(name) = field_text(node, "name", source) {
        return Some(name.to_string());
    }
    named_children(node)
        .into_iter()
        .find(|c| matches!(c.kind(), "type_identifier" | "simple_identifier" | "identifier"))
        .map(|c| node_text(c, source).to_string())
}

fn property_name(node: Node<'_>, source: &str) -> Option<String> {
    if let Some(declaration) = child_of_kind(node, "variable_declaration") {
        return declared_name(declaration, source);
    }
    declared_name(node, source)
}

fn modifiers_text(node: Node<'_>, source: &str) -> Option<String> {
    child_of_kind(node, "modifiers").map(|m| {
        node_text(m, source)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn base_attributes(context: &FileContext) -> IndexMap<String, String> {
    let mut attributes = IndexMap::new();
    if let Some(package) = &context.package {
        attributes.insert("package".to_string(), package.clone());
    }
    if let Some(imports) = &context.imports {
        attributes.insert("imports".to_string(), imports.clone());
    }
    attributes
}

fn qualified(context: &FileContext, types: &[String], leaf: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(package) = &context.package {
        parts.push(package);
    }
    parts.extend(types.iter().map(String::as_str));
    parts.push(leaf);
    join_qualified(&parts, ".")
}
