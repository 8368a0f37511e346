//! Grammar library downloads.
//!
//! Downloads stream to a `.part` sibling, are verified in place and only
//! then renamed into the cache, so an aborted or failed transfer never
//! leaves partial state behind. Transient failures retry with exponential
//! backoff.

use mbp_domain::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Progress observer for one download: `(downloaded_bytes, total_bytes, message)`.
pub type ProgressFn = dyn Fn(u64, Option<u64>, &str) + Send + Sync;

/// Borrowed progress callback handed to download operations.
pub type DownloadProgressCallback<'a> = &'a ProgressFn;

fn no_progress_fn(_downloaded: u64, _total: Option<u64>, _message: &str) {}

/// Sentinel callback that ignores all progress reports.
pub static NO_PROGRESS: &ProgressFn = &no_progress_fn;

const READ_CHUNK_BYTES: usize = 8192;
const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 250;

/// Streaming HTTP downloader with retry and verification.
pub struct Downloader {
    client: reqwest::blocking::Client,
    max_attempts: u32,
    base_backoff: Duration,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            max_attempts: MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
        }
    }

    /// Override the retry budget (used by tests to avoid long backoffs).
    pub fn with_retry(mut self, max_attempts: u32, base_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_backoff = base_backoff;
        self
    }

    /// Download `url` into `dest`, verifying before the final rename.
    ///
    /// The transfer lands in `{dest}.part`; after verification the part file
    /// is renamed over `dest`. Returns the number of bytes written. Retries
    /// with exponential backoff, removing the partial file between attempts.
    pub fn download_verified(
        &self,
        url: &str,
        dest: &Path,
        expected_size: Option<u64>,
        expected_sha256: Option<&str>,
        progress: DownloadProgressCallback<'_>,
    ) -> Result<u64> {
        let part = dest.with_extension("part");
        let mut last_error: Option<Error> = None;

        for attempt in 1..=self.max_attempts {
            match self.fetch_once(url, &part, progress) {
                Ok(bytes) => {
                    // Verification failures are terminal; the partial file
                    // must not survive either way
                    if let Err(err) = verify_library_file(&part, expected_size, expected_sha256) {
                        let _ = std::fs::remove_file(&part);
                        return Err(err);
                    }
                    std::fs::rename(&part, dest)?;
                    progress(bytes, Some(bytes), "download complete");
                    return Ok(bytes);
                }
                Err(err) => {
                    warn!(url, attempt, error = %err, "grammar download attempt failed");
                    let _ = std::fs::remove_file(&part);
                    last_error = Some(err);
                    if attempt < self.max_attempts {
                        std::thread::sleep(self.base_backoff * 2u32.pow(attempt - 1));
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::download(format!("download failed: {url}"))))
    }

    fn fetch_once(
        &self,
        url: &str,
        part: &Path,
        progress: DownloadProgressCallback<'_>,
    ) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::download_with_source(format!("request to {url} failed"), Box::new(e)))?;

        if !response.status().is_success() {
            return Err(Error::download(format!(
                "unexpected status {} from {url}",
                response.status()
            )));
        }

        // Create the cache directories only once the transfer is underway,
        // so failed downloads leave no empty version directories behind
        if let Some(parent) = part.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let total = response.content_length();
        progress(0, total, "starting download");

        let mut file = File::create(part)?;
        let mut buf = [0u8; READ_CHUNK_BYTES];
        let mut downloaded = 0u64;
        loop {
            let read = response
                .read(&mut buf)
                .map_err(|e| Error::download_with_source(format!("read from {url} failed"), Box::new(e)))?;
            if read == 0 {
                break;
            }
            file.write_all(&buf[..read])?;
            downloaded += read as u64;
            progress(downloaded, total, "downloading");
        }
        file.flush()?;
        debug!(url, downloaded, "grammar download finished");
        Ok(downloaded)
    }
}

/// Verify a downloaded library file: it must exist, be non-empty, and match
/// the expected size and SHA-256 digest when those are supplied.
pub fn verify_library_file(
    path: &Path,
    expected_size: Option<u64>,
    expected_sha256: Option<&str>,
) -> Result<()> {
    let meta = std::fs::metadata(path)
        .map_err(|_| Error::integrity(format!("library file missing: {}", path.display())))?;
    if meta.len() == 0 {
        return Err(Error::integrity(format!(
            "library file is empty: {}",
            path.display()
        )));
    }
    if let Some(expected) = expected_size
        && meta.len() != expected
    {
        return Err(Error::integrity(format!(
            "size mismatch for {}: expected {expected}, got {}",
            path.display(),
            meta.len()
        )));
    }
    if let Some(expected) = expected_sha256 {
        let actual = calculate_sha256(path)?;
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(Error::integrity(format!(
                "sha256 mismatch for {}: expected {expected}, got {actual}",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Streaming SHA-256 of a file, hex-encoded.
pub fn calculate_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_CHUNK_BYTES];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "Hello, World!").unwrap();
        assert_eq!(
            calculate_sha256(&path).unwrap(),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        // Deterministic
        assert_eq!(
            calculate_sha256(&path).unwrap(),
            calculate_sha256(&path).unwrap()
        );
    }

    #[test]
    fn sha256_missing_file_is_io_error() {
        let err = calculate_sha256(Path::new("/nonexistent/lib.so")).unwrap_err();
        assert!(matches!(err, Error::IoSimple { .. }));
    }

    #[test]
    fn verify_rejects_empty_and_mismatched_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.so");

        std::fs::write(&path, b"").unwrap();
        assert!(matches!(
            verify_library_file(&path, None, None).unwrap_err(),
            Error::Integrity { .. }
        ));

        std::fs::write(&path, b"grammar bytes").unwrap();
        assert!(verify_library_file(&path, Some(13), None).is_ok());
        assert!(matches!(
            verify_library_file(&path, Some(99), None).unwrap_err(),
            Error::Integrity { .. }
        ));
        assert!(matches!(
            verify_library_file(&path, None, Some("00ff")).unwrap_err(),
            Error::Integrity { .. }
        ));
    }
}
