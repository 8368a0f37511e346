//! Grammar manager.
//!
//! One façade over version pinning, the on-disk cache, downloads, dynamic
//! linking, version history and rollback. Mutations are serialized per
//! language; distinct languages proceed in parallel, and reads are
//! lock-free snapshots. Load failures are recoverable: callers get `None`
//! and a failed history entry, never a panic.

use crate::cache::GrammarCache;
use crate::config::GrammarConfig;
use crate::download::{Downloader, NO_PROGRESS, ProgressFn};
use crate::history::VersionHistory;
use crate::loader::{LibraryLoader, NativeLibraryLoader};
use crate::{platform, props, specs};
use dashmap::DashMap;
use mbp_domain::{
    CacheStats, GrammarSpec, GrammarVersionMetadata, Result, RollbackResult, VersionHistoryEntry,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use tree_sitter::Language;

/// Versions always preserved by rollback-aware cleanup.
pub const ROLLBACK_MIN_VERSIONS: usize = 10;

/// Default `keep` for cache cleanup.
pub const DEFAULT_CLEANUP_KEEP: usize = 5;

/// Grammar lifecycle manager (download, cache, verify, link, rollback).
pub struct GrammarManager {
    cache: GrammarCache,
    config: GrammarConfig,
    history: VersionHistory,
    loader: Arc<dyn LibraryLoader>,
    downloader: Downloader,
    download_base_url: String,
    progress: Option<Arc<ProgressFn>>,
    /// Loaded handles keyed by `(language, effective_version)`
    handles: DashMap<(String, String), Language>,
    /// Rollback overrides: language -> active version
    active_versions: DashMap<String, String>,
    /// Per-language mutation locks
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl GrammarManager {
    /// Manager over the resolved cache root and loaded configuration.
    pub fn new() -> Self {
        let config = GrammarConfig::load().unwrap_or_else(|err| {
            warn!(error = %err, "grammar configuration unreadable, using defaults");
            GrammarConfig::default()
        });
        Self {
            cache: GrammarCache::new(props::resolve_cache_root()),
            config,
            history: VersionHistory::new(),
            loader: Arc::new(NativeLibraryLoader::new()),
            downloader: Downloader::new(),
            download_base_url: "https://github.com".to_string(),
            progress: None,
            handles: DashMap::new(),
            active_versions: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    pub fn with_cache_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.cache = GrammarCache::new(root);
        self
    }

    pub fn with_config(mut self, config: GrammarConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn LibraryLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    /// Base URL downloads resolve against (release hosting).
    pub fn with_download_base_url<S: Into<String>>(mut self, base: S) -> Self {
        self.download_base_url = base.into();
        self
    }

    /// Default progress callback for downloads triggered by loads.
    pub fn with_progress(mut self, progress: Arc<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn language_lock(&self, language: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(language.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn progress_callback(&self) -> &ProgressFn {
        self.progress.as_deref().unwrap_or(NO_PROGRESS)
    }

    /// Release asset URL for one spec and version.
    fn download_url(&self, spec: &GrammarSpec, version: &str) -> String {
        format!(
            "{}/{}/releases/download/v{}/{}-{}{}",
            self.download_base_url,
            spec.repository(),
            version,
            spec.library_name(),
            platform::platform_string(),
            platform::library_extension()
        )
    }

    /// Resolve the effective version for a spec.
    ///
    /// Order: rollback override, per-language configured pin, global
    /// configured default, spec default. Returns an equal value when nothing
    /// overrides the spec's own version.
    pub fn apply_version_pinning(&self, spec: &GrammarSpec) -> GrammarSpec {
        if let Some(active) = self.active_versions.get(spec.language()) {
            return spec.with_version(active.value());
        }
        let effective = self
            .config
            .effective_version(spec.language(), spec.version());
        if effective == spec.version() {
            spec.clone()
        } else {
            spec.with_version(&effective)
        }
    }

    /// Load (or fetch) the grammar for a spec and return its language handle.
    ///
    /// Idempotent per `(language, effective_version)`. Returns `None` on any
    /// recoverable failure, recording a failed history entry.
    pub fn load_language(&self, spec: &GrammarSpec) -> Option<Language> {
        let pinned = self.apply_version_pinning(spec);
        let key = (
            pinned.language().to_string(),
            pinned.version().to_string(),
        );
        if let Some(handle) = self.handles.get(&key) {
            return Some(handle.value().clone());
        }

        let lock = self.language_lock(pinned.language());
        let _guard = lock.lock().expect("language lock poisoned");
        if let Some(handle) = self.handles.get(&key) {
            return Some(handle.value().clone());
        }

        match self.load_language_locked(spec, &pinned) {
            Ok(handle) => {
                self.handles.insert(key, handle.clone());
                self.history
                    .record(pinned.language(), pinned.version(), true, None);
                Some(handle)
            }
            Err(err) => {
                warn!(
                    language = pinned.language(),
                    version = pinned.version(),
                    error = %err,
                    "failed to load grammar"
                );
                self.history.record(
                    pinned.language(),
                    pinned.version(),
                    false,
                    Some(err.to_string()),
                );
                None
            }
        }
    }

    fn load_language_locked(
        &self,
        original: &GrammarSpec,
        pinned: &GrammarSpec,
    ) -> Result<Language> {
        // Pre-provisioned library override wins over everything
        if let Some(path) =
            props::resolve_library_override(pinned.property_key(), pinned.env_key())
        {
            debug!(
                language = pinned.language(),
                path = %path.display(),
                "loading grammar from library override"
            );
            return self.loader.load(&path, pinned.symbol());
        }

        // Spec-default version resolves to the embedded grammar
        if pinned.version() == original.version()
            && let Some(handle) = specs::bundled_language(pinned.language())
        {
            debug!(language = pinned.language(), "using embedded grammar");
            return Ok(handle);
        }

        // Versioned cache, downloading on miss
        let library = self.cache.library_path(pinned, pinned.version());
        if !library.is_file() {
            let url = self.download_url(pinned, pinned.version());
            info!(
                language = pinned.language(),
                version = pinned.version(),
                url,
                "downloading grammar library"
            );
            self.downloader.download_verified(
                &url,
                &library,
                None,
                None,
                self.progress_callback(),
            )?;
            self.cache.write_metadata(pinned, pinned.version())?;
        } else {
            crate::download::verify_library_file(&library, None, None)?;
        }
        self.loader.load(&library, pinned.symbol())
    }

    /// Zero-arg supplier that loads on demand (lazy parser init).
    pub fn language_supplier(
        manager: &Arc<Self>,
        spec: &GrammarSpec,
    ) -> impl Fn() -> Option<Language> + Send + Sync + use<> {
        let manager = Arc::clone(manager);
        let spec = spec.clone();
        move || manager.load_language(&spec)
    }

    /// Zero-arg thunk ensuring the native library is present and linked,
    /// without resolving the grammar symbol yet.
    pub fn native_loader(
        manager: &Arc<Self>,
        spec: &GrammarSpec,
    ) -> impl Fn() -> Result<()> + Send + Sync + use<> {
        let manager = Arc::clone(manager);
        let spec = spec.clone();
        move || manager.ensure_native(&spec)
    }

    fn ensure_native(&self, spec: &GrammarSpec) -> Result<()> {
        let pinned = self.apply_version_pinning(spec);
        let lock = self.language_lock(pinned.language());
        let _guard = lock.lock().expect("language lock poisoned");

        if let Some(path) =
            props::resolve_library_override(pinned.property_key(), pinned.env_key())
        {
            return self.loader.link(&path);
        }
        if pinned.version() == spec.version() && specs::bundled_language(pinned.language()).is_some()
        {
            // Embedded grammars are already part of the process image
            return Ok(());
        }
        let library = self.cache.library_path(&pinned, pinned.version());
        if !library.is_file() {
            let url = self.download_url(&pinned, pinned.version());
            self.downloader.download_verified(
                &url,
                &library,
                None,
                None,
                self.progress_callback(),
            )?;
            self.cache.write_metadata(&pinned, pinned.version())?;
        }
        self.loader.link(&library)
    }

    /// Metadata for a cached version; newest cached version when `version`
    /// is `None`.
    pub fn get_version_info(
        &self,
        language: &str,
        version: Option<&str>,
    ) -> Option<GrammarVersionMetadata> {
        self.cache.version_info(language, version)
    }

    /// Cached versions, newest first.
    pub fn get_cached_versions(&self, language: &str) -> Vec<String> {
        self.cache.cached_versions(language)
    }

    /// Remove cached versions beyond `keep` for one language.
    pub fn cleanup_old_versions(&self, language: &str, keep: usize) -> Result<u64> {
        let lock = self.language_lock(language);
        let _guard = lock.lock().expect("language lock poisoned");
        self.cache.cleanup_old_versions(language, keep)
    }

    /// Cleanup that always preserves enough versions for rollback.
    pub fn cleanup_old_versions_preserving_rollback(
        &self,
        language: &str,
        keep: usize,
    ) -> Result<u64> {
        self.cleanup_old_versions(language, keep.max(ROLLBACK_MIN_VERSIONS))
    }

    /// Remove cached versions beyond `keep` for every language.
    pub fn cleanup_all_old_versions(&self, keep: usize) -> Result<u64> {
        let mut removed = 0;
        for language in self.cache.cached_languages() {
            removed += self.cleanup_old_versions(&language, keep)?;
        }
        Ok(removed)
    }

    /// Lock-free cache statistics snapshot.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Append a failed entry to a language's version history.
    pub fn mark_version_as_failed(&self, language: &str, version: &str, reason: &str) {
        self.history
            .record(language, version, false, Some(reason.to_string()));
    }

    /// Version history, newest first.
    pub fn get_version_history(&self, language: &str) -> Vec<VersionHistoryEntry> {
        self.history.get(language)
    }

    /// Switch a language to a specific cached version.
    pub fn rollback_to_version(&self, language: &str, version: &str) -> RollbackResult {
        let Some(spec) = specs::builtin_spec(language) else {
            return RollbackResult::failed(language, &format!("unknown language: {language}"));
        };
        let lock = self.language_lock(language);
        let _guard = lock.lock().expect("language lock poisoned");

        let library = self.cache.library_path(spec, version);
        if !library.is_file() {
            return RollbackResult::failed(
                language,
                &format!("version {version} not found in cache"),
            );
        }

        let from = self
            .active_versions
            .get(language)
            .map(|v| v.value().clone())
            .or_else(|| Some(self.apply_version_pinning(spec).version().to_string()));

        match self.loader.load(&library, spec.symbol()) {
            Ok(handle) => {
                self.handles
                    .insert((language.to_string(), version.to_string()), handle);
                self.active_versions
                    .insert(language.to_string(), version.to_string());
                self.history.record(language, version, true, None);
                info!(language, version, "rolled back grammar version");
                RollbackResult::ok(language, from, version)
            }
            Err(err) => {
                self.history
                    .record(language, version, false, Some(err.to_string()));
                RollbackResult::failed(language, &err.to_string())
            }
        }
    }

    /// Walk the version history newest-first and roll back to the first
    /// previously-working version that still loads.
    ///
    /// Only a version's most recent verdict counts: a version whose latest
    /// entry is a failure is never chosen, even if it succeeded earlier.
    pub fn rollback_to_previous(&self, language: &str) -> RollbackResult {
        let entries = self.history.get(language);
        if entries.is_empty() {
            return RollbackResult::failed(language, "No version history available");
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.version.clone()) {
                continue;
            }
            if !entry.success {
                continue;
            }
            let result = self.rollback_to_version(language, &entry.version);
            if result.success {
                return result;
            }
            debug!(
                language,
                version = entry.version,
                "rollback candidate failed, trying older version"
            );
        }

        RollbackResult::failed(language, "No suitable previous version found")
    }
}

impl Default for GrammarManager {
    fn default() -> Self {
        Self::new()
    }
}
