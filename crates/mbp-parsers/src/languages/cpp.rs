//! C++ chunk extractor: classes, structs and functions/methods qualified by
//! namespace and class scope.

use crate::extractor::{
    ChunkExtractor, ChunkSink, child_of_kind, field_text, join_qualified, named_children,
    node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct CppExtractor;

impl ChunkExtractor for CppExtractor {
    fn language(&self) -> &'static str {
        "cpp"
    }

    fn extract(
        &self,
        root: Node<'_>,
        source: &str,
        coords: &SourceCoordinates,
        source_file: &str,
    ) -> Result<Vec<Chunk>> {
        // Overloads share names; the kind participates in the dedup key
        let mut sink =
            ChunkSink::new(self.language(), source, coords, source_file).with_type_keyed_dedup();
        let mut scope = Scope::default();
        walk(root, source, &mut scope, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

#[derive(Default)]
struct Scope {
    namespaces: Vec<String>,
    classes: Vec<String>,
}

impl Scope {
    fn qualify(&self, leaf: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        parts.extend(self.namespaces.iter().map(String::as_str));
        parts.extend(self.classes.iter().map(String::as_str));
        parts.push(leaf);
        join_qualified(&parts, ".")
    }
}

fn walk(node: Node<'_>, source: &str, scope: &mut Scope, sink: &mut ChunkSink<'_>) -> Result<()> {
    match node.kind() {
        "namespace_definition" => {
            let name = field_text(node, "name", source).map(str::to_string);
            if let Some(name) = &name {
                scope.namespaces.push(name.clone());
            }
            for child in named_children(node) {
                walk(child, source, scope, sink)?;
            }
            if name.is_some() {
                scope.namespaces.pop();
            }
            return Ok(());
        }
        "class_specifier" | "struct_specifier" => {
            if node.child_by_field_name("body").is_some()
                && let Some(name) = field_text(node, "name", source)
            {
                let entity_type = if node.kind() == "class_specifier" {
                    EntityType::Class
                } else {
                    EntityType::Struct
                };
                let mut attributes = IndexMap::new();
                if let Some(bases) = child_of_kind(node, "base_class_clause") {
                    attributes.insert("bases".to_string(), node_text(bases, source).to_string());
                }
                if let Some(params) = template_parameters(node, source) {
                    attributes.insert("template_parameters".to_string(), params);
                }
                sink.emit(entity_type, &scope.qualify(name), node, &attributes)?;

                scope.classes.push(name.to_string());
                for child in named_children(node) {
                    walk(child, source, scope, sink)?;
                }
                scope.classes.pop();
                return Ok(());
            }
        }
        "function_definition" => {
            if let Some(identifier) = declarator_identifier(node, source) {
                let entity_type = if scope.classes.is_empty() {
                    EntityType::Function
                } else {
                    EntityType::Method
                };
                let mut attributes = IndexMap::new();
                attributes.insert("identifier".to_string(), identifier.clone());
                if let Some(params) = parameters_of(node, source) {
                    attributes.insert("parameters".to_string(), params);
                }
                if let Some(ret) = field_text(node, "type", source) {
                    attributes.insert("return_type".to_string(), ret.to_string());
                }
                if let Some(tpl) = template_parameters(node, source) {
                    attributes.insert("template_parameters".to_string(), tpl);
                }
                sink.emit(entity_type, &scope.qualify(&identifier), node, &attributes)?;
            }
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, scope, sink)?;
    }
    Ok(())
}

/// Innermost name of a declarator: plain, qualified, destructor or operator.
fn declarator_identifier(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name"
            | "operator_name" => {
                return Some(node_text(current, source).to_string());
            }
            _ => current = current.child_by_field_name("declarator")?,
        }
    }
}

fn parameters_of(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        if current.kind() == "function_declarator" {
            return current
                .child_by_field_name("parameters")
                .map(|p| node_text(p, source).to_string());
        }
        current = current.child_by_field_name("declarator")?;
    }
}

/// Template parameter list of an enclosing `template_declaration`, if any.
fn template_parameters(node: Node<'_>, source: &str) -> Option<String> {
    let parent = node.parent()?;
    if parent.kind() != "template_declaration" {
        return None;
    }
    parent
        .child_by_field_name("parameters")
        .map(|p| node_text(p, source).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    #[test]
    fn namespaced_class_with_method() {
        let source = r"
namespace net {
class Socket : public Stream {
 public:
  int open(const char* host) { return 0; }
};
int listen(int port) { return port; }
}
";
        let chunks = extract(&CppExtractor, "cpp", source);
        assert_invariants(&chunks, source);

        let class = find(&chunks, "net.Socket").unwrap();
        assert_eq!(class.entity_type, EntityType::Class);
        assert!(class.attributes["bases"].contains("Stream"));

        let method = find(&chunks, "net.Socket.open").unwrap();
        assert_eq!(method.entity_type, EntityType::Method);
        assert_eq!(method.attributes["identifier"], "open");
        assert!(method.attributes["parameters"].contains("const char* host"));
        assert_eq!(method.attributes["return_type"], "int");

        let func = find(&chunks, "net.listen").unwrap();
        assert_eq!(func.entity_type, EntityType::Function);
    }

    #[test]
    fn template_struct_records_parameters() {
        let source = "template <typename T>\nstruct Box { T value; };\n";
        let chunks = extract(&CppExtractor, "cpp", source);
        let boxed = find(&chunks, "Box").unwrap();
        assert_eq!(boxed.entity_type, EntityType::Struct);
        assert!(boxed.attributes["template_parameters"].contains("typename T"));
    }

    #[test]
    fn free_function_outside_namespace() {
        let source = "int main() { return 0; }\n";
        let chunks = extract(&CppExtractor, "cpp", source);
        let main = find(&chunks, "main").unwrap();
        assert_eq!(main.entity_type, EntityType::Function);
    }
}
