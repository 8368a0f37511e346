//! C# chunk extractor: namespace-qualified types, methods, properties and
//! fields.

use crate::extractor::{
    ChunkExtractor, ChunkSink, child_of_kind, field_text, join_qualified, named_children,
    node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct CSharpExtractor;

impl ChunkExtractor for CSharpExtractor {
    fn language(&self) -> &'static str {
        "csharp"
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
    fn qualify(&self, leaf: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(ns) = &self.namespace {
            parts.push(ns);
        }
        parts.extend(self.types.iter().map(String::as_str));
        parts.push(leaf);
        join_qualified(&parts, ".")
    }

    fn enclosing_type(&self) -> Option<String> {
        if self.types.is_empty() {
            None
        } else {
            Some(self.qualify("").trim_end_matches('.').to_string())
        }
    }
}

fn type_entity(kind: &str) -> Option<EntityType> {
    match kind {
        "class_declaration" => Some(EntityType::Class),
        "interface_declaration" => Some(EntityType::Interface),
        "struct_declaration" => Some(EntityType::Struct),
        "enum_declaration" => Some(EntityType::Enum),
        "record_declaration" => Some(EntityType::Record),
        _ => None,
    }
}

fn walk(node: Node<'_>, source: &str, scope: &mut Scope, sink: &mut ChunkSink<'_>) -> Result<()> {
    if matches!(
        node.kind(),
        "namespace_declaration" | "file_scoped_namespace_declaration"
    ) {
        let previous = scope.namespace.clone();
        if let Some(name) = field_text(node, "name", source) {
            scope.namespace = Some(match &previous {
                Some(outer) => format!("{outer}.{name}"),
                None => name.to_string(),
            });
        }
        for child in named_children(node) {
            walk(child, source, scope, sink)?;
        }
        // A file-scoped namespace extends to end of file; only block
        // namespaces restore the outer scope
        if node.kind() == "namespace_declaration" {
            scope.namespace = previous;
        }
        return Ok(());
    }

    if let Some(entity_type) = type_entity(node.kind()) {
        if let Some(name) = field_text(node, "name", source) {
            let mut attributes = IndexMap::new();
            if let Some(ns) = &scope.namespace {
                attributes.insert("namespace".to_string(), ns.clone());
            }
            if let Some(modifiers) = modifiers_of(node, source) {
                attributes.insert("modifiers".to_string(), modifiers);
            }
            if let Some(params) = field_text(node, "type_parameters", source).or_else(|| {
                child_of_kind(node, "type_parameter_list").map(|n| node_text(n, source))
            }) {
                attributes.insert("type_parameters".to_string(), params.to_string());
            }
            if let Some(bases) = child_of_kind(node, "base_list") {
                attributes.insert("base_list".to_string(), node_text(bases, source).to_string());
            }
            if let Some(enclosing) = scope.enclosing_type() {
                attributes.insert("enclosing_type".to_string(), enclosing);
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
        "method_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = member_attributes(node, source, scope);
                if let Some(params) = field_text(node, "parameters", source) {
                    attributes.insert("parameters".to_string(), params.to_string());
                }
                // Grammar versions disagree on the return-type field name
                if let Some(ret) =
                    field_text(node, "returns", source).or_else(|| field_text(node, "type", source))
                {
                    attributes.insert("return_type".to_string(), ret.to_string());
                }
                sink.emit(EntityType::Method, &scope.qualify(name), node, &attributes)?;
            }
        }
        "property_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = member_attributes(node, source, scope);
                if let Some(ty) = field_text(node, "type", source) {
                    attributes.insert("type".to_string(), ty.to_string());
                }
                sink.emit(EntityType::Property, &scope.qualify(name), node, &attributes)?;
            }
        }
        "field_declaration" => {
            // The names live on the variable declarators inside the
            // variable declaration
            if let Some(declaration) = child_of_kind(node, "variable_declaration") {
                let ty = field_text(declaration, "type", source).map(str::to_string);
                for declarator in named_children(declaration) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    if let Some(name) = field_text(declarator, "name", source)
                        .or_else(|| {
                            named_children(declarator)
                                .first()
                                .map(|n| node_text(*n, source))
                        })
                    {
                        let mut attributes = member_attributes(node, source, scope);
                        if let Some(ty) = &ty {
                            attributes.insert("type".to_string(), ty.clone());
                        }
                        sink.emit(EntityType::Field, &scope.qualify(name), node, &attributes)?;
                    }
                }
            }
            return Ok(());
        }
        _ => {}
    }

    for child in named_children(node) {
        walk(child, source, scope, sink)?;
    }
    Ok(())
}

fn member_attributes(
    node: Node<'_>,
    source: &str,
    scope: &Scope,
) -> IndexMap<String, String> {
    let mut attributes = IndexMap::new();
    if let Some(ns) = &scope.namespace {
        attributes.insert("namespace".to_string(), ns.clone());
    }
    if let Some(modifiers) = modifiers_of(node, source) {
        attributes.insert("modifiers".to_string(), modifiers);
    }
    if let Some(enclosing) = scope.enclosing_type() {
        attributes.insert("enclosing_type".to_string(), enclosing);
    }
    attributes
}

/// Space-joined modifier keywords preceding the declaration name.
fn modifiers_of(node: Node<'_>, source: &str) -> Option<String> {
    let modifiers: Vec<&str> = named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "modifier")
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

    #[test]
    fn namespace_class_members() {
        let source = r"
namespace App.Core {
    public class Repo<T> : IRepo<T> {
        private string name;
        public string Name { get; set; }
        public T Load(int id) { return default; }
    }
}
";
        let chunks = extract(&CSharpExtractor, "csharp", source);
        assert_invariants(&chunks, source);

        let class = find(&chunks, "App.Core.Repo").unwrap();
        assert_eq!(class.entity_type, EntityType::Class);
        assert_eq!(class.attributes["namespace"], "App.Core");
        assert!(class.attributes["modifiers"].contains("public"));
        assert!(class.attributes["type_parameters"].contains('T'));
        assert!(class.attributes["base_list"].contains("IRepo<T>"));

        let field = find(&chunks, "App.Core.Repo.name").unwrap();
        assert_eq!(field.entity_type, EntityType::Field);
        assert_eq!(field.attributes["type"], "string");
        assert_eq!(field.attributes["enclosing_type"], "App.Core.Repo");

        let property = find(&chunks, "App.Core.Repo.Name").unwrap();
        assert_eq!(property.entity_type, EntityType::Property);

        let method = find(&chunks, "App.Core.Repo.Load").unwrap();
        assert_eq!(method.entity_type, EntityType::Method);
        assert!(method.attributes["parameters"].contains("int id"));
        assert_eq!(method.attributes["return_type"], "T");
    }

    #[test]
    fn file_scoped_namespace_and_record() {
        let source = "namespace App;\npublic record Point(int X, int Y);\n";
        let chunks = extract(&CSharpExtractor, "csharp", source);
        let record = find(&chunks, "App.Point").unwrap();
        assert_eq!(record.entity_type, EntityType::Record);
    }

    #[test]
    fn interface_and_enum() {
        let source = "interface IClock { }\nenum Color { Red, Green }\n";
        let chunks = extract(&CSharpExtractor, "csharp", source);
        assert_eq!(find(&chunks, "IClock").unwrap().entity_type, EntityType::Interface);
        assert_eq!(find(&chunks, "Color").unwrap().entity_type, EntityType::Enum);
    }
}
