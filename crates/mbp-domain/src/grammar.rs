//! Grammar value objects.
//!
//! Immutable descriptors and records used by the grammar manager: the
//! per-language [`GrammarSpec`], on-disk version metadata, version history
//! entries and rollback results.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable descriptor of one language grammar.
///
/// `symbol` is the native entry-point name (e.g. `tree_sitter_python`),
/// `library_name` the base name of the shared library file, `repository` the
/// upstream repo slug and `version` the default semver string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarSpec {
    language: String,
    symbol: String,
    library_name: String,
    property_key: String,
    env_key: String,
    repository: String,
    version: String,
}

impl GrammarSpec {
    /// Create a spec; every field must be non-blank.
    pub fn new(
        language: &str,
        symbol: &str,
        library_name: &str,
        property_key: &str,
        env_key: &str,
        repository: &str,
        version: &str,
    ) -> Result<Self> {
        let fields = [
            ("language", language),
            ("symbol", symbol),
            ("library_name", library_name),
            ("property_key", property_key),
            ("env_key", env_key),
            ("repository", repository),
            ("version", version),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::invalid_argument(format!(
                    "grammar spec field `{name}` must not be blank"
                )));
            }
        }
        Ok(Self {
            language: language.to_string(),
            symbol: symbol.to_string(),
            library_name: library_name.to_string(),
            property_key: property_key.to_string(),
            env_key: env_key.to_string(),
            repository: repository.to_string(),
            version: version.to_string(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    pub fn property_key(&self) -> &str {
        &self.property_key
    }

    pub fn env_key(&self) -> &str {
        &self.env_key
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Copy of this spec with a different version.
    pub fn with_version(&self, version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..self.clone()
        }
    }
}

/// Metadata written next to each cached grammar library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarVersionMetadata {
    pub language: String,
    pub version: String,
    pub repository: String,
    /// RFC-3339 download timestamp
    pub downloaded_at: DateTime<Utc>,
    pub platform: String,
    pub file_size_bytes: u64,
}

/// One load attempt in a language's version history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHistoryEntry {
    pub language: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Outcome of a rollback operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackResult {
    pub success: bool,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RollbackResult {
    /// Successful rollback from `from` to `to`.
    pub fn ok(language: &str, from: Option<String>, to: &str) -> Self {
        Self {
            success: true,
            language: language.to_string(),
            from_version: from,
            to_version: Some(to.to_string()),
            error_message: None,
        }
    }

    /// Failed rollback with a reason.
    pub fn failed(language: &str, message: &str) -> Self {
        Self {
            success: false,
            language: language.to_string(),
            from_version: None,
            to_version: None,
            error_message: Some(message.to_string()),
        }
    }
}

/// Aggregate statistics over the grammar cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_languages: u64,
    pub total_versions: u64,
    pub total_files: u64,
    pub library_files: u64,
    pub metadata_files: u64,
    pub total_size_bytes: u64,
    pub library_size_bytes: u64,
}
