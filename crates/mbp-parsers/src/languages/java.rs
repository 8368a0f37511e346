//! Tree-sitter Java chunk extractor.
//!
//! Dot-qualified names throughout (`com.example.Foo.bar`), unlike the
//! built-in Java parser which joins members with `#`.

use crate::extractor::{
    ChunkExtractor, ChunkSink, child_of_kind, field_text, join_qualified, named_children,
    node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct JavaExtractor;

impl ChunkExtractor for JavaExtractor {
    fn language(&self) -> &'static str {
        "java"
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
                "package_declaration" => {
                    package = named_children(child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                        .map(|n| node_text(n, source).to_string());
                }
                "import_declaration" => {
                    if let Some(target) = named_children(child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                    {
                        imports.push(node_text(target, source).to_string());
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

fn type_entity(kind: &str) -> Option<EntityType> {
    match kind {
        "class_declaration" => Some(EntityType::Class),
        "interface_declaration" => Some(EntityType::Interface),
        "enum_declaration" => Some(EntityType::Enum),
        "record_declaration" => Some(EntityType::Record),
        "annotation_type_declaration" => Some(EntityType::Annotation),
        _ => None,
    }
}

fn walk(
    node: Node<'_>,
    source: &str,
    context: &FileContext,
    types: &mut Vec<String>,
    sink: &mut ChunkSink<'_>,
) -> Result<()> {
    if let Some(entity_type) = type_entity(node.kind()) {
        if let Some(name) = field_text(node, "name", source) {
            let mut attributes = base_attributes(context);
            add_modifier_attributes(node, source, &mut attributes);
            if let Some(params) = field_text(node, "type_parameters", source) {
                attributes.insert("type_parameters".to_string(), params.to_string());
            }
            if let Some(superclass) = field_text(node, "superclass", source) {
                attributes.insert(
                    "superclass".to_string(),
                    superclass.trim_start_matches("extends").trim().to_string(),
                );
            }
            if let Some(interfaces) = field_text(node, "interfaces", source) {
                attributes.insert(
                    "interfaces".to_string(),
                    interfaces.trim_start_matches("implements").trim().to_string(),
                );
            }
            if !types.is_empty() {
                attributes.insert("enclosing_type".to_string(), qualified(context, types, ""));
            }
            sink.emit(entity_type, &qualified(context, types, name), node, &attributes)?;

            types.push(name.to_string());
            for child in named_children(node) {
                walk(child, source, context, types, sink)?;
            }
            types.pop();
        }
        return Ok(());
    }

    match node.kind() {
        "method_declaration" | "constructor_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let entity_type = if node.kind() == "constructor_declaration" {
                    EntityType::Constructor
                } else {
                    EntityType::Method
                };
                let mut attributes = base_attributes(context);
                add_modifier_attributes(node, source, &mut attributes);
                if let Some(params) = field_text(node, "type_parameters", source) {
                    attributes.insert("type_parameters".to_string(), params.to_string());
                }
                if let Some(params) = field_text(node, "parameters", source) {
                    attributes.insert("parameters".to_string(), params.to_string());
                }
                if let Some(ret) = field_text(node, "type", source) {
                    attributes.insert("return_type".to_string(), ret.to_string());
                }
                if let Some(throws) = child_of_kind(node, "throws") {
                    attributes.insert("throws".to_string(), node_text(throws, source).to_string());
                }
                if !types.is_empty() {
                    attributes.insert("enclosing_type".to_string(), qualified(context, types, ""));
                }
                sink.emit(entity_type, &qualified(context, types, name), node, &attributes)?;
            }
        }
        "field_declaration" => {
            let ty = field_text(node, "type", source).map(str::to_string);
            for declarator in named_children(node) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                if let Some(name) = field_text(declarator, "name", source) {
                    let mut attributes = base_attributes(context);
                    add_modifier_attributes(node, source, &mut attributes);
                    if let Some(ty) = &ty {
                        attributes.insert("type".to_string(), ty.clone());
                    }
                    if !types.is_empty() {
                        attributes
                            .insert("enclosing_type".to_string(), qualified(context, types, ""));
                    }
                    sink.emit(EntityType::Field, &qualified(context, types, name), node, &attributes)?;
                }
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

/// Split a `modifiers` child into keyword modifiers and annotations.
fn add_modifier_attributes(
    node: Node<'_>,
    source: &str,
    attributes: &mut IndexMap<String, String>,
) {
    let Some(modifiers) = child_of_kind(node, "modifiers") else {
        return;
    };
    let mut keywords = Vec::new();
    let mut annotations = Vec::new();
    for child in crate::extractor::all_children(modifiers) {
        let text = node_text(child, source);
        if matches!(child.kind(), "annotation" | "marker_annotation") {
            annotations.push(text.to_string());
        } else {
            keywords.push(text.to_string());
        }
    }
    if !keywords.is_empty() {
        attributes.insert("modifiers".to_string(), keywords.join(" "));
    }
    if !annotations.is_empty() {
        attributes.insert("annotations".to_string(), annotations.join(","));
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    const SOURCE: &str = r"
package com.example;

import java.util.List;
import java.io.IOException;

public class Sample extends Base implements Runnable {
    private String name;

    public Sample(String name) { this.name = name; }

    @Override
    public void run() { }

    public List<String> load(int count) throws IOException { return null; }

    static class Nested { }
}
";

    #[test]
    fn dot_qualified_members() {
        let chunks = extract(&JavaExtractor, "java", SOURCE);
        assert_invariants(&chunks, SOURCE);

        let class = find(&chunks, "com.example.Sample").unwrap();
        assert_eq!(class.entity_type, EntityType::Class);
        assert_eq!(class.attributes["package"], "com.example");
        assert_eq!(class.attributes["imports"], "java.util.List,java.io.IOException");
        assert_eq!(class.attributes["superclass"], "Base");
        assert!(class.attributes["interfaces"].contains("Runnable"));
        assert!(class.attributes["modifiers"].contains("public"));

        let field = find(&chunks, "com.example.Sample.name").unwrap();
        assert_eq!(field.entity_type, EntityType::Field);
        assert_eq!(field.attributes["type"], "String");

        let ctor = find(&chunks, "com.example.Sample.Sample").unwrap();
        assert_eq!(ctor.entity_type, EntityType::Constructor);

        let run = find(&chunks, "com.example.Sample.run").unwrap();
        assert_eq!(run.entity_type, EntityType::Method);
        assert_eq!(run.attributes["annotations"], "@Override");

        let load = find(&chunks, "com.example.Sample.load").unwrap();
        assert!(load.attributes["throws"].contains("IOException"));
        assert_eq!(load.attributes["return_type"], "List<String>");

        let nested = find(&chunks, "com.example.Sample.Nested").unwrap();
        assert_eq!(nested.entity_type, EntityType::Class);
        assert_eq!(nested.attributes["enclosing_type"], "com.example.Sample");
    }
}
