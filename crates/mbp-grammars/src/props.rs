//! Process-wide configuration hooks.
//!
//! Overrides resolve in the same order everywhere: process property first,
//! then environment variable, then the built-in default. Properties are the
//! runtime-settable equivalent of env vars and take precedence over them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{LazyLock, RwLock};

/// Property that overrides the grammar cache root.
pub const CACHE_DIR_PROPERTY: &str = "megabrain.grammar.cache.dir";

/// Environment variable that overrides the grammar cache root.
pub const CACHE_DIR_ENV: &str = "MEGABRAIN_GRAMMAR_CACHE_DIR";

static PROPERTIES: LazyLock<RwLock<HashMap<String, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Set a process-wide property.
pub fn set_property(key: &str, value: &str) {
    let mut props = PROPERTIES.write().expect("property table poisoned");
    props.insert(key.to_string(), value.to_string());
}

/// Read a process-wide property.
pub fn get_property(key: &str) -> Option<String> {
    let props = PROPERTIES.read().expect("property table poisoned");
    props.get(key).cloned()
}

/// Remove a process-wide property.
pub fn clear_property(key: &str) {
    let mut props = PROPERTIES.write().expect("property table poisoned");
    props.remove(key);
}

/// Non-blank property value, trimmed.
fn property_or_env(property_key: &str, env_key: &str) -> Option<String> {
    if let Some(value) = get_property(property_key) {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    if let Ok(value) = std::env::var(env_key) {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

/// Resolve the grammar cache root: property, then env var, then
/// `$HOME/.megabrain/grammars`.
pub fn resolve_cache_root() -> PathBuf {
    if let Some(dir) = property_or_env(CACHE_DIR_PROPERTY, CACHE_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".megabrain")
        .join("grammars")
}

/// Resolve a pre-provisioned library path for one language, if any.
///
/// Checks the spec's property key (`tree.sitter.{lang}.library`) and env key
/// (`TREE_SITTER_{LANG}_LIB`).
pub fn resolve_library_override(property_key: &str, env_key: &str) -> Option<PathBuf> {
    property_or_env(property_key, env_key).map(PathBuf::from)
}
