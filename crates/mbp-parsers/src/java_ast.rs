//! Built-in Java parser.
//!
//! Parses Java with the embedded (statically linked) grammar instead of the
//! managed grammar pipeline, so Java extraction works even with an empty
//! grammar cache. Member names are qualified with `#` and carry the
//! parameter-type signature: `com.example.Foo#greet(String)`. Anonymous
//! classes are numbered `AnonymousClass{N}` in walk order.

use crate::extractor::{
    ChunkExtractor, ChunkSink, all_children, child_of_kind, field_text, named_children,
    node_text,
};
use crate::parser::SourceParser;
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Error, Result, SourceCoordinates};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

pub struct JavaAstParser;

impl JavaAstParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JavaAstParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for JavaAstParser {
    fn language(&self) -> &str {
        "java"
    }

    fn extensions(&self) -> &[&'static str] {
        &[".java"]
    }

    fn parse(&self, path: &Path) -> Result<Vec<Chunk>> {
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_argument("path must not be empty"));
        }
        if !self.supports(path) {
            return Ok(Vec::new());
        }
        if !path.is_file() {
            return Err(Error::invalid_argument(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable source file");
                return Ok(Vec::new());
            }
        };

        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
        if let Err(err) = parser.set_language(&language) {
            warn!(error = %err, "embedded java grammar rejected by parser");
            return Ok(Vec::new());
        }
        let Some(tree) = parser.parse(&source, None) else {
            warn!(path = %path.display(), "parser produced no tree");
            return Ok(Vec::new());
        };

        let coords = SourceCoordinates::new(&source);
        let file = path.to_string_lossy();
        let extractor = JavaAstExtractor;
        let extracted = catch_unwind(AssertUnwindSafe(|| {
            extractor.extract(tree.root_node(), &source, &coords, &file)
        }));
        match extracted {
            Ok(Ok(chunks)) => {
                debug!(path = %path.display(), count = chunks.len(), "extracted java chunks");
                Ok(chunks)
            }
            Ok(Err(err)) => {
                warn!(path = %path.display(), error = %err, "java extraction failed");
                Ok(Vec::new())
            }
            Err(_) => {
                warn!(path = %path.display(), "java extractor panicked");
                Ok(Vec::new())
            }
        }
    }
}

/// The walk itself, reusable against any parsed Java tree.
pub struct JavaAstExtractor;

impl ChunkExtractor for JavaAstExtractor {
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
        let mut context = Context {
            package: package_of(root, source),
            types: Vec::new(),
            anonymous_counter: 0,
        };
        walk(root, source, &mut context, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

struct Context {
    package: Option<String>,
    /// Simple names of the enclosing types, outermost first
    types: Vec<String>,
    anonymous_counter: u32,
}

impl Context {
    /// FQN of the current enclosing type, e.g. `com.example.Foo.Bar`.
    fn type_fqn(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(pkg) = &self.package {
            parts.push(pkg);
        }
        parts.extend(self.types.iter().map(String::as_str));
        parts.join(".")
    }

    fn qualified_type(&self, simple_name: &str) -> String {
        let enclosing = self.type_fqn();
        if enclosing.is_empty() {
            simple_name.to_string()
        } else {
            format!("{enclosing}.{simple_name}")
        }
    }

    /// Member name: `{type-fqn}#{signature}`.
    fn qualified_member(&self, signature: &str) -> String {
        let enclosing = self.type_fqn();
        if enclosing.is_empty() {
            signature.to_string()
        } else {
            format!("{enclosing}#{signature}")
        }
    }
}

fn package_of(root: Node<'_>, source: &str) -> Option<String> {
    let decl = child_of_kind(root, "package_declaration")?;
    named_children(decl)
        .into_iter()
        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
        .map(|n| node_text(n, source).to_string())
}

fn walk(node: Node<'_>, source: &str, context: &mut Context, sink: &mut ChunkSink<'_>) -> Result<()> {
    match node.kind() {
        "class_declaration" | "interface_declaration" => {
            let entity_type = if node.kind() == "interface_declaration" {
                EntityType::Interface
            } else {
                EntityType::Class
            };
            return walk_type(node, source, context, sink, entity_type);
        }
        "enum_declaration" => return walk_type(node, source, context, sink, EntityType::Enum),
        "record_declaration" => return walk_type(node, source, context, sink, EntityType::Record),
        "method_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let signature = format!("{name}({})", parameter_types(node, source));
                let mut attributes = member_attributes(node, source, context, "method");
                if let Some(ret) = field_text(node, "type", source) {
                    attributes.insert("returnType".to_string(), ret.to_string());
                }
                attributes.insert("parameters".to_string(), parameter_pairs(node, source));
                attributes.insert("signature".to_string(), signature.clone());
                sink.emit(
                    EntityType::Method,
                    &context.qualified_member(&signature),
                    node,
                    &attributes,
                )?;
            }
        }
        "constructor_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let signature = format!("{name}({})", parameter_types(node, source));
                let mut attributes = member_attributes(node, source, context, "constructor");
                attributes.insert("parameters".to_string(), parameter_pairs(node, source));
                attributes.insert("signature".to_string(), signature.clone());
                sink.emit(
                    EntityType::Constructor,
                    &context.qualified_member(&signature),
                    node,
                    &attributes,
                )?;
            }
        }
        "field_declaration" => {
            let field_type = field_text(node, "type", source).map(str::to_string);
            for declarator in named_children(node) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                if let Some(name) = field_text(declarator, "name", source) {
                    let mut attributes = member_attributes(node, source, context, "field");
                    if let Some(ty) = &field_type {
                        attributes.insert("fieldType".to_string(), ty.clone());
                    }
                    sink.emit(
                        EntityType::Field,
                        &context.qualified_member(name),
                        node,
                        &attributes,
                    )?;
                }
            }
            // Fall through: initializers may declare anonymous classes
        }
        "object_creation_expression" => {
            // Only creations with a body declare an anonymous class
            if let Some(body) = child_of_kind(node, "class_body") {
                context.anonymous_counter += 1;
                let anon_name = format!("AnonymousClass{}", context.anonymous_counter);
                let mut attributes = IndexMap::new();
                if let Some(pkg) = &context.package {
                    attributes.insert("package".to_string(), pkg.clone());
                }
                let parent = context.type_fqn();
                if !parent.is_empty() {
                    attributes.insert("parent".to_string(), parent);
                }
                if let Some(ty) = field_text(node, "type", source) {
                    attributes.insert("type".to_string(), ty.to_string());
                }
                attributes.insert("kind".to_string(), "anonymous_class".to_string());
                sink.emit(
                    EntityType::AnonymousClass,
                    &context.qualified_type(&anon_name),
                    node,
                    &attributes,
                )?;

                context.types.push(anon_name);
                for child in named_children(body) {
                    walk(child, source, context, sink)?;
                }
                context.types.pop();
                return Ok(());
            }
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, context, sink)?;
    }
    Ok(())
}

fn walk_type(
    node: Node<'_>,
    source: &str,
    context: &mut Context,
    sink: &mut ChunkSink<'_>,
    entity_type: EntityType,
) -> Result<()> {
    let Some(name) = field_text(node, "name", source) else {
        return Ok(());
    };
    let mut attributes = IndexMap::new();
    if let Some(pkg) = &context.package {
        attributes.insert("package".to_string(), pkg.clone());
    }
    let parent = context.type_fqn();
    if !context.types.is_empty() {
        attributes.insert("parent".to_string(), parent);
    }
    if let Some(modifiers) = modifiers_text(node, source) {
        attributes.insert("modifiers".to_string(), modifiers);
    }
    attributes.insert("kind".to_string(), entity_type.as_str().to_string());
    sink.emit(entity_type, &context.qualified_type(name), node, &attributes)?;

    context.types.push(name.to_string());
    for child in named_children(node) {
        walk(child, source, context, sink)?;
    }
    context.types.pop();
    Ok(())
}

fn member_attributes(
    node: Node<'_>,
    source: &str,
    context: &Context,
    kind: &str,
) -> IndexMap<String, String> {
    let mut attributes = IndexMap::new();
    if let Some(pkg) = &context.package {
        attributes.insert("package".to_string(), pkg.clone());
    }
    let parent = context.type_fqn();
    if !parent.is_empty() {
        attributes.insert("parent".to_string(), parent);
    }
    if let Some(modifiers) = modifiers_text(node, source) {
        attributes.insert("modifiers".to_string(), modifiers);
    }
    attributes.insert("kind".to_string(), kind.to_string());
    attributes
}

/// Space-joined modifier keywords, annotations excluded.
fn modifiers_text(node: Node<'_>, source: &str) -> Option<String> {
    let modifiers = child_of_kind(node, "modifiers")?;
    let keywords: Vec<&str> = all_children(modifiers)
        .into_iter()
        .filter(|c| !matches!(c.kind(), "annotation" | "marker_annotation"))
        .map(|c| node_text(c, source))
        .collect();
    if keywords.is_empty() {
        None
    } else {
        Some(keywords.join(" "))
    }
}

/// Comma-joined parameter types: `String, int`.
fn parameter_types(node: Node<'_>, source: &str) -> String {
    collect_parameters(node, source)
        .iter()
        .map(|(ty, _)| ty.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Comma-joined `type name` pairs: `String name, int count`.
fn parameter_pairs(node: Node<'_>, source: &str) -> String {
    collect_parameters(node, source)
        .iter()
        .map(|(ty, name)| format!("{ty} {name}").trim().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn collect_parameters(node: Node<'_>, source: &str) -> Vec<(String, String)> {
    let Some(params) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    named_children(params)
        .into_iter()
        .filter(|p| matches!(p.kind(), "formal_parameter" | "spread_parameter"))
        .map(|p| {
            let ty = field_text(p, "type", source).unwrap_or_default().to_string();
            let name = field_text(p, "name", source).unwrap_or_default().to_string();
            (ty, name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ChunkExtractor;

    fn extract(source: &str) -> Vec<Chunk> {
        let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
        let mut parser = Parser::new();
        parser.set_language(&language).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let coords = SourceCoordinates::new(source);
        JavaAstExtractor
            .extract(tree.root_node(), source, &coords, "Sample.java")
            .unwrap()
    }

    fn find<'a>(chunks: &'a [Chunk], name: &str) -> Option<&'a Chunk> {
        chunks.iter().find(|c| c.entity_name == name)
    }

    const SAMPLE: &str = r#"
package com.example;

public class Sample {
    private String name;

    public Sample(String name) { this.name = name; }

    public String greet(String t) { return "hi " + t; }
}
"#;

    #[test]
    fn hash_qualified_members_with_signatures() {
        let chunks = extract(SAMPLE);

        let class = find(&chunks, "com.example.Sample").unwrap();
        assert_eq!(class.entity_type, EntityType::Class);
        assert_eq!(class.attributes["kind"], "class");
        assert_eq!(class.attributes["modifiers"], "public");

        let field = find(&chunks, "com.example.Sample#name").unwrap();
        assert_eq!(field.entity_type, EntityType::Field);
        assert_eq!(field.attributes["fieldType"], "String");
        assert_eq!(field.attributes["parent"], "com.example.Sample");

        let ctor = find(&chunks, "com.example.Sample#Sample(String)").unwrap();
        assert_eq!(ctor.entity_type, EntityType::Constructor);
        assert_eq!(ctor.attributes["parameters"], "String name");

        let greet = find(&chunks, "com.example.Sample#greet(String)").unwrap();
        assert_eq!(greet.entity_type, EntityType::Method);
        assert_eq!(greet.attributes["returnType"], "String");
        assert_eq!(greet.attributes["signature"], "greet(String)");
    }

    #[test]
    fn nested_types_join_with_dots() {
        let source = r"
package com.example;
class Outer {
    static class Inner {
        void run() {}
    }
}
";
        let chunks = extract(source);
        let inner = find(&chunks, "com.example.Outer.Inner").unwrap();
        assert_eq!(inner.attributes["parent"], "com.example.Outer");
        assert!(find(&chunks, "com.example.Outer.Inner#run()").is_some());
    }

    #[test]
    fn anonymous_classes_are_numbered() {
        let source = r"
package com.example;
class Holder {
    Runnable first = new Runnable() {
        public void run() {}
    };
    Runnable second = new Runnable() {
        public void run() {}
    };
}
";
        let chunks = extract(source);
        let first = find(&chunks, "com.example.Holder.AnonymousClass1").unwrap();
        assert_eq!(first.entity_type, EntityType::AnonymousClass);
        assert_eq!(first.attributes["type"], "Runnable");
        assert!(find(&chunks, "com.example.Holder.AnonymousClass2").is_some());
        // Their methods are qualified under the anonymous name
        assert!(find(&chunks, "com.example.Holder.AnonymousClass1#run()").is_some());
    }

    #[test]
    fn default_package_has_bare_names() {
        let source = "class Plain { void go() {} }";
        let chunks = extract(source);
        assert!(find(&chunks, "Plain").is_some());
        assert!(find(&chunks, "Plain#go()").is_some());
    }

    #[test]
    fn enum_and_record() {
        let source = "package p;\nenum Color { RED }\nrecord Point(int x, int y) {}\n";
        let chunks = extract(source);
        assert_eq!(find(&chunks, "p.Color").unwrap().entity_type, EntityType::Enum);
        assert_eq!(find(&chunks, "p.Point").unwrap().entity_type, EntityType::Record);
    }
}
