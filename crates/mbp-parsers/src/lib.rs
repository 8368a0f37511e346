//! Parser framework for MegaBrain Parser.
//!
//! A [`SourceParser`] turns one file into a sequence of semantic chunks.
//! Most parsers are a [`TreeSitterParser`] carrying a language-specific
//! [`ChunkExtractor`]; Java additionally has a built-in parser over the
//! embedded grammar. The [`ParserRegistry`] routes file extensions to
//! parser instances and is the entry point for ingestion pipelines.

pub mod extractor;
pub mod java_ast;
pub mod languages;
pub mod parser;
pub mod registry;

pub use extractor::{ChunkExtractor, ChunkSink};
pub use java_ast::JavaAstParser;
pub use parser::{SourceParser, TreeSitterParser, traverse_depth_first};
pub use registry::ParserRegistry;
