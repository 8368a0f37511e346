//! Download-and-cache integration tests over a local HTTP server.

use mbp_domain::Error;
use mbp_grammars::config::GrammarConfig;
use mbp_grammars::download::{Downloader, NO_PROGRESS};
use mbp_grammars::loader::LibraryLoader;
use mbp_grammars::manager::GrammarManager;
use mbp_grammars::{builtin_spec, bundled_language, calculate_sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct StubLoader;

impl LibraryLoader for StubLoader {
    fn link(&self, path: &Path) -> mbp_domain::Result<()> {
        if path.is_file() {
            Ok(())
        } else {
            Err(Error::io(format!("missing {}", path.display())))
        }
    }

    fn load(&self, path: &Path, _symbol: &str) -> mbp_domain::Result<tree_sitter::Language> {
        if path.is_file() {
            Ok(bundled_language("python").expect("embedded python grammar"))
        } else {
            Err(Error::io(format!("missing {}", path.display())))
        }
    }
}

fn pinned_manager(root: &Path, base_url: &str, language: &str, version: &str) -> GrammarManager {
    let mut versions = HashMap::new();
    versions.insert(language.to_string(), version.to_string());
    GrammarManager::new()
        .with_cache_root(root)
        .with_config(GrammarConfig::with_values(None, versions))
        .with_loader(Arc::new(StubLoader))
        .with_downloader(Downloader::new().with_retry(1, Duration::ZERO))
        .with_download_base_url(base_url)
}

#[test]
fn pinned_version_downloads_caches_and_loads() {
    let mut server = mockito::Server::new();
    let body = b"\x7fELF pretend grammar library".to_vec();
    let mock = server
        .mock(
            "GET",
            mockito::Matcher::Regex(r"^/tree-sitter/tree-sitter-python/releases/download/v9\.0\.0/.*$".to_string()),
        )
        .with_status(200)
        .with_body(body.clone())
        .create();

    let dir = tempfile::tempdir().unwrap();
    let manager = pinned_manager(dir.path(), &server.url(), "python", "9.0.0");
    let spec = builtin_spec("python").unwrap();

    let handle = manager.load_language(spec);
    assert!(handle.is_some());
    mock.assert();

    // Library file and metadata landed in the versioned layout
    assert_eq!(manager.get_cached_versions("python"), vec!["9.0.0"]);
    let info = manager.get_version_info("python", Some("9.0.0")).unwrap();
    assert_eq!(info.language, "python");
    assert_eq!(info.version, "9.0.0");
    assert_eq!(info.file_size_bytes, body.len() as u64);

    // Idempotent: second load hits the in-memory handle cache, not HTTP
    assert!(manager.load_language(spec).is_some());

    let stats = manager.cache_stats();
    assert_eq!(stats.total_languages, 1);
    assert_eq!(stats.library_files, 1);
    assert_eq!(stats.metadata_files, 1);
}

#[test]
fn server_error_yields_none_and_failed_history() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", mockito::Matcher::Any)
        .with_status(500)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let manager = pinned_manager(dir.path(), &server.url(), "ruby", "9.0.0");
    let spec = builtin_spec("ruby").unwrap();

    assert!(manager.load_language(spec).is_none());
    let history = manager.get_version_history("ruby");
    assert!(!history[0].success);

    // No partial files left behind
    assert!(manager.get_cached_versions("ruby").is_empty());
    assert_eq!(manager.cache_stats().total_files, 0);
}

#[test]
fn downloader_reports_progress() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/asset.so")
        .with_status(200)
        .with_body(vec![0xAAu8; 20_000])
        .create();

    let calls = Arc::new(AtomicU64::new(0));
    let max_seen = Arc::new(AtomicU64::new(0));
    let calls_in_cb = Arc::clone(&calls);
    let max_in_cb = Arc::clone(&max_seen);

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("asset.so");
    let downloader = Downloader::new().with_retry(1, Duration::ZERO);
    let url = format!("{}/asset.so", server.url());
    let written = downloader
        .download_verified(
            &url,
            &dest,
            Some(20_000),
            None,
            &move |downloaded, _total, _message| {
                calls_in_cb.fetch_add(1, Ordering::SeqCst);
                max_in_cb.fetch_max(downloaded, Ordering::SeqCst);
            },
        )
        .unwrap();

    assert_eq!(written, 20_000);
    assert!(calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(max_seen.load(Ordering::SeqCst), 20_000);
    assert!(dest.is_file());
    assert!(!dir.path().join("asset.part").exists());
}

#[test]
fn download_gives_up_after_configured_attempts() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/flaky.so")
        .with_status(503)
        .expect(3)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("flaky.so");
    let downloader = Downloader::new().with_retry(3, Duration::from_millis(1));
    let err = downloader
        .download_verified(
            &format!("{}/flaky.so", server.url()),
            &dest,
            None,
            None,
            NO_PROGRESS,
        )
        .unwrap_err();

    mock.assert();
    assert!(matches!(err, Error::Download { .. }));
    assert!(!dest.exists());
    assert!(!dir.path().join("flaky.part").exists());
}

#[test]
fn hash_mismatch_fails_verification_and_removes_partial() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/lib.so")
        .with_status(200)
        .with_body(b"real bytes".to_vec())
        .create();

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("lib.so");
    let downloader = Downloader::new().with_retry(1, Duration::ZERO);
    let err = downloader
        .download_verified(
            &format!("{}/lib.so", server.url()),
            &dest,
            None,
            Some("deadbeef"),
            NO_PROGRESS,
        )
        .unwrap_err();

    assert!(matches!(err, Error::Integrity { .. }));
    assert!(!dest.exists());
}

#[test]
fn sha256_of_downloaded_file_matches_served_bytes() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/hello.so")
        .with_status(200)
        .with_body(b"Hello, World!".to_vec())
        .create();

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("hello.so");
    Downloader::new()
        .with_retry(1, Duration::ZERO)
        .download_verified(
            &format!("{}/hello.so", server.url()),
            &dest,
            None,
            Some("dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"),
            NO_PROGRESS,
        )
        .unwrap();

    assert_eq!(
        calculate_sha256(&dest).unwrap(),
        "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
    );
}

#[test]
fn concurrent_loads_of_distinct_languages_proceed() {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(
        GrammarManager::new()
            .with_cache_root(dir.path())
            .with_config(GrammarConfig::default())
            .with_loader(Arc::new(StubLoader)),
    );

    let results = Arc::new(Mutex::new(Vec::new()));
    std::thread::scope(|scope| {
        for language in ["python", "go", "ruby", "rust"] {
            let manager = Arc::clone(&manager);
            let results = Arc::clone(&results);
            scope.spawn(move || {
                let spec = builtin_spec(language).unwrap();
                let loaded = manager.load_language(spec).is_some();
                results.lock().unwrap().push((language, loaded));
            });
        }
    });

    let results = results.lock().unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|(_, loaded)| *loaded));
}
