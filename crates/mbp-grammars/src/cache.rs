//! Versioned on-disk grammar cache.
//!
//! Layout: `{cache}/{language}/{version}/{platform}/{library-base}.{ext}`
//! with a sibling `metadata.json`. Version directories are ordered by
//! comparing their dotted segments numerically, newest first, so `10.0.0`
//! ranks above `9.0.0`; directory names whose segments do not parse as
//! integers are skipped when listing.

use crate::platform;
use chrono::Utc;
use mbp_domain::{CacheStats, Error, GrammarSpec, GrammarVersionMetadata, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const METADATA_FILE: &str = "metadata.json";
const LIBRARY_EXTENSIONS: &[&str] = &["so", "dylib", "dll"];

/// Handle to the cache root directory.
#[derive(Debug, Clone)]
pub struct GrammarCache {
    root: PathBuf,
}

impl GrammarCache {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{cache}/{language}`
    pub fn language_dir(&self, language: &str) -> PathBuf {
        self.root.join(language)
    }

    /// `{cache}/{language}/{version}/{platform}`
    pub fn platform_dir(&self, language: &str, version: &str) -> PathBuf {
        self.language_dir(language)
            .join(version)
            .join(platform::platform_string())
    }

    /// Full path of the cached library file for one spec and version.
    pub fn library_path(&self, spec: &GrammarSpec, version: &str) -> PathBuf {
        self.platform_dir(spec.language(), version).join(format!(
            "{}{}",
            spec.library_name(),
            platform::library_extension()
        ))
    }

    /// Whether a version's library file is present for the current platform.
    pub fn has_version(&self, spec: &GrammarSpec, version: &str) -> bool {
        self.library_path(spec, version).is_file()
    }

    fn metadata_path(&self, language: &str, version: &str) -> PathBuf {
        self.platform_dir(language, version).join(METADATA_FILE)
    }

    /// Write the sidecar metadata for a freshly cached library.
    pub fn write_metadata(&self, spec: &GrammarSpec, version: &str) -> Result<GrammarVersionMetadata> {
        let library = self.library_path(spec, version);
        let file_size_bytes = fs::metadata(&library)?.len();
        let metadata = GrammarVersionMetadata {
            language: spec.language().to_string(),
            version: version.to_string(),
            repository: spec.repository().to_string(),
            downloaded_at: Utc::now(),
            platform: platform::platform_string(),
            file_size_bytes,
        };
        let path = self.metadata_path(spec.language(), version);
        fs::write(&path, serde_json::to_vec_pretty(&metadata)?)?;
        Ok(metadata)
    }

    /// Read sidecar metadata; malformed or missing files read as `None`.
    pub fn read_metadata(&self, language: &str, version: &str) -> Option<GrammarVersionMetadata> {
        let path = self.metadata_path(language, version);
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!(language, version, error = %err, "ignoring malformed grammar metadata");
                None
            }
        }
    }

    /// Cached version directory names for a language, newest first.
    ///
    /// Dotted segments compare numerically, so `10.0.0` is newer than
    /// `9.0.0`. Names that do not parse as dotted integers are skipped.
    pub fn cached_versions(&self, language: &str) -> Vec<String> {
        let dir = self.language_dir(language);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut versions: Vec<(Vec<u64>, String)> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter_map(|name| version_key(&name).map(|key| (key, name)))
            .collect();
        versions.sort_by(|a, b| b.0.cmp(&a.0));
        versions.into_iter().map(|(_, name)| name).collect()
    }

    /// Metadata for a specific version, or for the newest cached version
    /// when `version` is `None`.
    pub fn version_info(
        &self,
        language: &str,
        version: Option<&str>,
    ) -> Option<GrammarVersionMetadata> {
        match version {
            Some(v) => self.read_metadata(language, v),
            None => self
                .cached_versions(language)
                .first()
                .and_then(|newest| self.read_metadata(language, newest)),
        }
    }

    /// Remove the oldest version directories beyond `keep`. Returns the
    /// number of versions removed. `keep` must be at least 1.
    pub fn cleanup_old_versions(&self, language: &str, keep: usize) -> Result<u64> {
        if keep < 1 {
            return Err(Error::invalid_argument("keep must be >= 1"));
        }
        let versions = self.cached_versions(language);
        let mut removed = 0u64;
        for version in versions.iter().skip(keep) {
            let dir = self.language_dir(language).join(version);
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    debug!(language, version, "removed old grammar version");
                    removed += 1;
                }
                Err(err) => {
                    warn!(language, version, error = %err, "failed to remove grammar version");
                }
            }
        }
        Ok(removed)
    }

    /// Run [`Self::cleanup_old_versions`] for every cached language.
    pub fn cleanup_all_old_versions(&self, keep: usize) -> Result<u64> {
        if keep < 1 {
            return Err(Error::invalid_argument("keep must be >= 1"));
        }
        let mut removed = 0u64;
        for language in self.cached_languages() {
            removed += self.cleanup_old_versions(&language, keep)?;
        }
        Ok(removed)
    }

    /// Names of all language directories under the cache root.
    pub fn cached_languages(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut languages: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        languages.sort();
        languages
    }

    /// Lock-free snapshot of cache-wide statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for language in self.cached_languages() {
            stats.total_languages += 1;
            stats.total_versions += self.cached_versions(&language).len() as u64;
        }
        for entry in WalkDir::new(&self.root).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            stats.total_files += 1;
            stats.total_size_bytes += size;
            let name = entry.file_name().to_string_lossy();
            if name == METADATA_FILE {
                stats.metadata_files += 1;
            } else if entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| LIBRARY_EXTENSIONS.contains(&ext))
            {
                stats.library_files += 1;
                stats.library_size_bytes += size;
            }
        }
        stats
    }
}

/// Numeric sort key of a version directory name: `0.25.0` -> `[0, 25, 0]`.
/// Returns `None` when any segment is not an integer.
fn version_key(name: &str) -> Option<Vec<u64>> {
    if name.is_empty() {
        return None;
    }
    name.split('.').map(|part| part.parse::<u64>().ok()).collect()
}
