//! Go chunk extractor: package-qualified types, functions and receiver
//! methods.

use crate::extractor::{
    ChunkExtractor, ChunkSink, child_of_kind, field_text, join_qualified, named_children,
    node_text,
};
use indexmap::IndexMap;
use mbp_domain::{Chunk, EntityType, Result, SourceCoordinates};
use tree_sitter::Node;

pub struct GoExtractor;

impl ChunkExtractor for GoExtractor {
    fn language(&self) -> &'static str {
        "go"
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
        walk(root, source, &context, &mut sink)?;
        Ok(sink.into_chunks())
    }
}

/// Read-only per-file context gathered from root-level nodes.
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
                "package_clause" => {
                    package = child_of_kind(child, "package_identifier")
                        .map(|n| node_text(n, source).to_string());
                }
                "import_declaration" => {
                    collect_import_paths(child, source, &mut imports);
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

    fn qualify(&self, parts: &[&str]) -> String {
        let mut all: Vec<&str> = Vec::new();
        if let Some(pkg) = &self.package {
            all.push(pkg);
        }
        all.extend_from_slice(parts);
        join_qualified(&all, ".")
    }

    fn base_attributes(&self) -> IndexMap<String, String> {
        let mut attributes = IndexMap::new();
        if let Some(pkg) = &self.package {
            attributes.insert("package".to_string(), pkg.clone());
        }
        if let Some(imports) = &self.imports {
            attributes.insert("imports".to_string(), imports.clone());
        }
        attributes
    }
}

fn collect_import_paths(node: Node<'_>, source: &str, out: &mut Vec<String>) {
    for child in named_children(node) {
        match child.kind() {
            "import_spec" => {
                if let Some(path) = field_text(child, "path", source) {
                    out.push(path.trim_matches('"').to_string());
                }
            }
            "import_spec_list" => collect_import_paths(child, source, out),
            _ => {}
        }
    }
}

fn walk(
    node: Node<'_>,
    source: &str,
    context: &FileContext,
    sink: &mut ChunkSink<'_>,
) -> Result<()> {
    match node.kind() {
        "type_declaration" => {
            for spec in named_children(node) {
                if spec.kind() != "type_spec" {
                    continue;
                }
                let Some(name) = field_text(spec, "name", source) else {
                    continue;
                };
                let entity_type = match spec.child_by_field_name("type").map(|t| t.kind()) {
                    Some("struct_type") => EntityType::Struct,
                    Some("interface_type") => EntityType::Interface,
                    _ => EntityType::Type,
                };
                let attributes = context.base_attributes();
                sink.emit(entity_type, &context.qualify(&[name]), node, &attributes)?;
            }
            return Ok(());
        }
        "function_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let mut attributes = context.base_attributes();
                if let Some(params) = field_text(node, "parameters", source) {
                    attributes.insert("parameters".to_string(), params.to_string());
                }
                if let Some(result) = field_text(node, "result", source) {
                    attributes.insert("return_type".to_string(), result.to_string());
                }
                sink.emit(
                    EntityType::Function,
                    &context.qualify(&[name]),
                    node,
                    &attributes,
                )?;
            }
        }
        "method_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let receiver = field_text(node, "receiver", source);
                let receiver_type = receiver.map(receiver_type_name);
                let mut attributes = context.base_attributes();
                if let Some(recv) = receiver {
                    attributes.insert("receiver".to_string(), recv.to_string());
                }
                if let Some(recv_ty) = &receiver_type
                    && !recv_ty.is_empty()
                {
                    attributes.insert(
                        "enclosing_type".to_string(),
                        context.qualify(&[recv_ty]),
                    );
                }
                if let Some(params) = field_text(node, "parameters", source) {
                    attributes.insert("parameters".to_string(), params.to_string());
                }
                if let Some(result) = field_text(node, "result", source) {
                    attributes.insert("return_type".to_string(), result.to_string());
                }
                let qualified = match &receiver_type {
                    Some(recv_ty) if !recv_ty.is_empty() => context.qualify(&[recv_ty, name]),
                    _ => context.qualify(&[name]),
                };
                sink.emit(EntityType::Method, &qualified, node, &attributes)?;
            }
        }
        _ => {}
    }
    for child in named_children(node) {
        walk(child, source, context, sink)?;
    }
    Ok(())
}

/// Bare receiver type name: `(s *Server)` -> `Server`, `(l []Item)` -> `Item`.
fn receiver_type_name(receiver: &str) -> String {
    let inner = receiver.trim_matches(|c| c == '(' || c == ')');
    let ty = inner.split_whitespace().last().unwrap_or("");
    ty.trim_start_matches('*')
        .trim_start_matches("[]")
        .trim_start_matches('*')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::testutil::{assert_invariants, extract, find};

    const SOURCE: &str = r#"package server

import (
    "fmt"
    "net/http"
)

type Server struct {
    addr string
}

type Handler interface {
    Handle() error
}

type ID int64

func New(addr string) *Server { return &Server{addr: addr} }

func (s *Server) Start(port int) error {
    fmt.Println(port)
    return nil
}
"#;

    #[test]
    fn package_types_functions_methods() {
        let chunks = extract(&GoExtractor, "go", SOURCE);
        assert_invariants(&chunks, SOURCE);

        let server = find(&chunks, "server.Server").unwrap();
        assert_eq!(server.entity_type, EntityType::Struct);
        assert_eq!(server.attributes["package"], "server");
        assert_eq!(server.attributes["imports"], "fmt,net/http");

        let handler = find(&chunks, "server.Handler").unwrap();
        assert_eq!(handler.entity_type, EntityType::Interface);

        let id = find(&chunks, "server.ID").unwrap();
        assert_eq!(id.entity_type, EntityType::Type);

        let new = find(&chunks, "server.New").unwrap();
        assert_eq!(new.entity_type, EntityType::Function);
        assert!(new.attributes["parameters"].contains("addr string"));

        let start = find(&chunks, "server.Server.Start").unwrap();
        assert_eq!(start.entity_type, EntityType::Method);
        assert_eq!(start.attributes["receiver"], "(s *Server)");
        assert_eq!(start.attributes["enclosing_type"], "server.Server");
        assert_eq!(start.attributes["return_type"], "error");
    }

    #[test]
    fn slice_receiver_is_stripped() {
        assert_eq!(receiver_type_name("(items []Item)"), "Item");
        assert_eq!(receiver_type_name("(s *Server)"), "Server");
        assert_eq!(receiver_type_name("(c Config)"), "Config");
    }
}
