//! In-memory per-language version history.

use chrono::Utc;
use dashmap::DashMap;
use mbp_domain::VersionHistoryEntry;

/// Maximum entries retained per language, newest first.
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Per-language ordered history of grammar load attempts.
#[derive(Debug, Default)]
pub struct VersionHistory {
    entries: DashMap<String, Vec<VersionHistoryEntry>>,
}

impl VersionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a load attempt. The newest entry sits at index 0 and the list
    /// is truncated to [`MAX_HISTORY_ENTRIES`].
    pub fn record(&self, language: &str, version: &str, success: bool, error: Option<String>) {
        let entry = VersionHistoryEntry {
            language: language.to_string(),
            version: version.to_string(),
            timestamp: Utc::now(),
            success,
            error_message: error,
        };
        let mut list = self.entries.entry(language.to_string()).or_default();
        list.insert(0, entry);
        list.truncate(MAX_HISTORY_ENTRIES);
    }

    /// Snapshot of a language's history, newest first.
    pub fn get(&self, language: &str) -> Vec<VersionHistoryEntry> {
        self.entries
            .get(language)
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}
