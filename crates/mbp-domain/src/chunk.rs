//! Semantic chunk model.
//!
//! A [`Chunk`] is the unit of output of the whole engine: one named code
//! entity with its raw content, byte/line positions and language-specific
//! attributes. Every downstream consumer (keyword index, vector store,
//! dependency graph) reads this one schema.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed vocabulary of chunk entity kinds.
///
/// Each language extractor emits a subset of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Class,
    Interface,
    Struct,
    Enum,
    Record,
    Trait,
    Object,
    Module,
    Namespace,
    Protocol,
    Extension,
    Function,
    Method,
    Constructor,
    Field,
    Property,
    Constant,
    TypeAlias,
    SingletonMethod,
    Annotation,
    SealedClass,
    DataClass,
    AnonymousClass,
    Type,
}

impl EntityType {
    /// Stable lowercase identifier used in serialized chunks
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Record => "record",
            Self::Trait => "trait",
            Self::Object => "object",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Protocol => "protocol",
            Self::Extension => "extension",
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Field => "field",
            Self::Property => "property",
            Self::Constant => "constant",
            Self::TypeAlias => "type_alias",
            Self::SingletonMethod => "singleton_method",
            Self::Annotation => "annotation",
            Self::SealedClass => "sealed_class",
            Self::DataClass => "data_class",
            Self::AnonymousClass => "anonymous_class",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named code entity extracted from a source file.
///
/// Positions are 1-based inclusive lines and 0-based end-exclusive bytes;
/// `content` is the raw source slice `[start_byte, end_byte)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Raw UTF-8 substring of the source between `start_byte` and `end_byte`
    pub content: String,
    /// Lowercase language identifier (`java`, `cpp`, `python`, ...)
    pub language: String,
    /// Kind of entity this chunk represents
    pub entity_type: EntityType,
    /// Fully qualified entity name
    pub entity_name: String,
    /// Path of the file the chunk was extracted from
    pub source_file: String,
    /// 1-based first line, inclusive
    pub start_line: u32,
    /// 1-based last line, inclusive
    pub end_line: u32,
    /// 0-based first byte
    pub start_byte: usize,
    /// 0-based end byte, exclusive
    pub end_byte: usize,
    /// Language-specific attributes, in insertion order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

impl Chunk {
    /// Create a chunk, validating the positional invariants.
    ///
    /// `lines` is `(start_line, end_line)` and `bytes` is
    /// `(start_byte, end_byte)`. Passing `None` for `attributes` yields an
    /// empty map; a provided map is copied.
    pub fn new(
        language: &str,
        entity_type: EntityType,
        entity_name: &str,
        source_file: &str,
        content: &str,
        lines: (u32, u32),
        bytes: (usize, usize),
        attributes: Option<&IndexMap<String, String>>,
    ) -> Result<Self> {
        let (start_line, end_line) = lines;
        let (start_byte, end_byte) = bytes;

        if language.is_empty() {
            return Err(Error::invalid_chunk("language must not be empty"));
        }
        if entity_name.is_empty() {
            return Err(Error::invalid_chunk(format!(
                "entity name must not be empty ({source_file}:{start_line})"
            )));
        }
        if start_line < 1 || end_line < start_line {
            return Err(Error::invalid_chunk(format!(
                "invalid line range {start_line}..{end_line} for {entity_name}"
            )));
        }
        if end_byte < start_byte {
            return Err(Error::invalid_chunk(format!(
                "invalid byte range {start_byte}..{end_byte} for {entity_name}"
            )));
        }
        if content.len() != end_byte - start_byte {
            return Err(Error::invalid_chunk(format!(
                "content length {} does not match byte range {start_byte}..{end_byte} for {entity_name}",
                content.len()
            )));
        }

        Ok(Self {
            content: content.to_string(),
            language: language.to_string(),
            entity_type,
            entity_name: entity_name.to_string(),
            source_file: source_file.to_string(),
            start_line,
            end_line,
            start_byte,
            end_byte,
            attributes: attributes.cloned().unwrap_or_default(),
        })
    }

    /// Dedup key: `entity_name|start_byte|end_byte`
    pub fn dedup_key(&self) -> String {
        format!("{}|{}|{}", self.entity_name, self.start_byte, self.end_byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn valid_chunk_round_trips() {
        let map = attrs(&[("parameters", "(int a)"), ("return_type", "int")]);
        let chunk = Chunk::new(
            "c",
            EntityType::Function,
            "add",
            "add.c",
            "int add(int a)",
            (1, 1),
            (0, 14),
            Some(&map),
        )
        .unwrap();

        assert_eq!(chunk.entity_type.as_str(), "function");
        // Insertion order is preserved
        let keys: Vec<_> = chunk.attributes.keys().cloned().collect();
        assert_eq!(keys, vec!["parameters", "return_type"]);

        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(chunk, back);
    }

    #[test]
    fn missing_attributes_yield_empty_map() {
        let chunk = Chunk::new(
            "python",
            EntityType::Function,
            "f",
            "f.py",
            "def f(): ...",
            (1, 1),
            (0, 12),
            None,
        )
        .unwrap();
        assert!(chunk.attributes.is_empty());
    }

    #[test]
    fn rejects_inverted_ranges() {
        let err = Chunk::new(
            "go",
            EntityType::Function,
            "f",
            "f.go",
            "",
            (2, 1),
            (0, 0),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidChunk { .. }));

        let err = Chunk::new(
            "go",
            EntityType::Function,
            "f",
            "f.go",
            "",
            (1, 1),
            (5, 2),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidChunk { .. }));
    }

    #[test]
    fn rejects_zero_start_line() {
        let err = Chunk::new(
            "go",
            EntityType::Function,
            "f",
            "f.go",
            "",
            (0, 1),
            (0, 0),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidChunk { .. }));
    }

    #[test]
    fn rejects_content_length_mismatch() {
        let err = Chunk::new(
            "go",
            EntityType::Function,
            "f",
            "f.go",
            "func f()",
            (1, 1),
            (0, 4),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidChunk { .. }));
    }
}
