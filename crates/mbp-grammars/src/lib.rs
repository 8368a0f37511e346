//! Grammar management for MegaBrain Parser.
//!
//! Resolves, downloads, caches, verifies and dynamically links native
//! tree-sitter grammar libraries, tracks per-language version history and
//! supports rollback to a previously-working version. The statically linked
//! grammar crates double as the embedded default for every supported
//! language, so nothing touches the network unless a version pin or a
//! pre-provisioned library override asks for it.

pub mod cache;
pub mod config;
pub mod download;
pub mod history;
pub mod loader;
pub mod manager;
pub mod platform;
pub mod props;
pub mod specs;

pub use cache::GrammarCache;
pub use config::GrammarConfig;
pub use download::{DownloadProgressCallback, NO_PROGRESS, calculate_sha256};
pub use loader::{LibraryLoader, NativeLibraryLoader};
pub use manager::GrammarManager;
pub use specs::{builtin_spec, builtin_specs, bundled_language};
