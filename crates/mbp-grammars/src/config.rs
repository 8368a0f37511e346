//! Grammar version configuration.
//!
//! A typed, read-only view over external configuration deciding which grammar
//! version is effective for each language. Sources are merged defaults →
//! TOML file → `MEGABRAIN_GRAMMARS_*` environment variables; a missing
//! configuration yields an empty map and an absent default.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use mbp_domain::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment prefix for grammar configuration overrides.
const ENV_PREFIX: &str = "MEGABRAIN_GRAMMARS_";

/// Typed grammar configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrammarConfig {
    /// Global default version applied when no per-language pin exists
    #[serde(default)]
    default_version: Option<String>,
    /// Per-language version pins
    #[serde(default)]
    versions: HashMap<String, String>,
}

impl GrammarConfig {
    /// Load from the default config file location merged with env vars.
    ///
    /// The default file is `$HOME/.megabrain/grammars.toml`.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_path().as_deref())
    }

    /// Load from an explicit TOML file (may be absent) merged with env vars.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path
            && path.exists()
        {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));
        figment
            .extract()
            .map_err(|e| Error::Config {
                message: "failed to load grammar configuration".to_string(),
                source: Some(Box::new(e)),
            })
    }

    /// Build a configuration from explicit values (used by tests and the CLI).
    pub fn with_values(
        default_version: Option<String>,
        versions: HashMap<String, String>,
    ) -> Self {
        Self {
            default_version,
            versions,
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".megabrain").join("grammars.toml"))
    }

    /// Global default version, if configured.
    pub fn default_version(&self) -> Option<&str> {
        self.default_version.as_deref()
    }

    /// Per-language version pins.
    pub fn language_versions(&self) -> &HashMap<String, String> {
        &self.versions
    }

    /// Effective version for a language: per-language pin (trimmed), else the
    /// global default, else the spec default. Blank values are ignored.
    pub fn effective_version(&self, language: &str, spec_default: &str) -> String {
        if let Some(pinned) = self.versions.get(language) {
            let pinned = pinned.trim();
            if !pinned.is_empty() {
                return pinned.to_string();
            }
        }
        if let Some(default) = &self.default_version {
            let default = default.trim();
            if !default.is_empty() {
                return default.to_string();
            }
        }
        spec_default.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_empty() {
        let config = GrammarConfig::load_from(Some(Path::new("/nonexistent/grammars.toml")))
            .expect("absent file is not an error");
        assert!(config.default_version().is_none());
        assert!(config.language_versions().is_empty());
        assert_eq!(config.effective_version("python", "0.25.0"), "0.25.0");
    }

    #[test]
    fn per_language_pin_wins_over_default() {
        let mut versions = HashMap::new();
        versions.insert("python".to_string(), " 0.26.1 ".to_string());
        let config = GrammarConfig::with_values(Some("1.0.0".to_string()), versions);
        assert_eq!(config.effective_version("python", "0.25.0"), "0.26.1");
        assert_eq!(config.effective_version("go", "0.25.0"), "1.0.0");
    }

    #[test]
    fn blank_pin_falls_through() {
        let mut versions = HashMap::new();
        versions.insert("python".to_string(), "   ".to_string());
        let config = GrammarConfig::with_values(None, versions);
        assert_eq!(config.effective_version("python", "0.25.0"), "0.25.0");
    }

    #[test]
    fn toml_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grammars.toml");
        std::fs::write(
            &path,
            "default_version = \"2.0.0\"\n[versions]\nruby = \"0.23.1\"\n",
        )
        .unwrap();
        let config = GrammarConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.default_version(), Some("2.0.0"));
        assert_eq!(config.effective_version("ruby", "0.23.0"), "0.23.1");
        assert_eq!(config.effective_version("swift", "0.7.0"), "2.0.0");
    }
}
