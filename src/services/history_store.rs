//! Persistent teleport history.
//!
//! Owns the on-disk history document: one ordered list of timestamped
//! entries, rewritten wholesale on every save. History is best effort:
//! unreadable documents load as empty and failed writes are logged, never
//! returned to the caller.
//!
//! # Document format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": [
//!     { "name": "Ahern (128, 128, 20)",
//!       "url": "https://maps.secondlife.com/secondlife/Ahern/128/128/20",
//!       "timestamp": 1700000000 }
//!   ]
//! }
//! ```
//!
//! Timestamps are read leniently: integer seconds or an RFC 3339 string.

use crate::gc::{RetentionPolicy, RetentionResult};
use crate::models::HistoryEntry;
use crate::storage::HistoryPersistence;
use crate::{Error, Result, current_timestamp};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Document name for the teleport history.
pub const TELEPORT_HISTORY_DOCUMENT: &str = "teleport_history";

const DOCUMENT_VERSION: u32 = 1;

const fn default_version() -> u32 {
    DOCUMENT_VERSION
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryDocument {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    entries: Vec<StoredEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    timestamp: serde_json::Value,
}

impl From<&HistoryEntry> for StoredEntry {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            name: entry.name.clone(),
            url: entry.url.clone(),
            timestamp: serde_json::Value::from(entry.timestamp),
        }
    }
}

impl StoredEntry {
    fn timestamp(&self) -> Option<i64> {
        match &self.timestamp {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp())
                .or_else(|| s.trim().parse().ok()),
            _ => None,
        }
    }

    fn to_entry(&self) -> Option<HistoryEntry> {
        let timestamp = self.timestamp()?;
        Some(HistoryEntry::new(self.name.clone(), self.url.clone(), timestamp))
    }
}

/// Parses a history document, skipping records with unreadable timestamps.
fn parse_document(contents: &str) -> Result<Vec<HistoryEntry>> {
    let document: HistoryDocument =
        serde_json::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_history_document".to_string(),
            cause: e.to_string(),
        })?;

    if document.version > DOCUMENT_VERSION {
        debug!(
            version = document.version,
            "History document is newer than this build, reading known fields"
        );
    }

    let total = document.entries.len();
    let entries: Vec<HistoryEntry> = document
        .entries
        .iter()
        .filter_map(StoredEntry::to_entry)
        .collect();

    if entries.len() < total {
        warn!(
            skipped = total - entries.len(),
            "Skipped history records with malformed timestamps"
        );
    }

    Ok(entries)
}

fn render_document(entries: &[HistoryEntry]) -> Result<String> {
    let document = HistoryDocument {
        version: DOCUMENT_VERSION,
        entries: entries.iter().map(StoredEntry::from).collect(),
    };
    serde_json::to_string_pretty(&document).map_err(|e| Error::OperationFailed {
        operation: "serialize_history_document".to_string(),
        cause: e.to_string(),
    })
}

/// Persistent, age-trimmed teleport history.
pub struct PersistentHistoryStore {
    backend: Arc<dyn HistoryPersistence>,
    document: String,
    policy: RetentionPolicy,
    entries: Vec<HistoryEntry>,
}

impl PersistentHistoryStore {
    /// Creates a store over `backend`. Nothing is read until [`load`](Self::load).
    #[must_use]
    pub fn new(backend: Arc<dyn HistoryPersistence>, policy: RetentionPolicy) -> Self {
        Self {
            backend,
            document: TELEPORT_HISTORY_DOCUMENT.to_string(),
            policy,
            entries: Vec::new(),
        }
    }

    /// Uses a different document name.
    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = document.into();
        self
    }

    /// Reads the document and drops entries past the retention age.
    pub fn load(&mut self) -> &[HistoryEntry] {
        self.load_at(current_timestamp())
    }

    /// [`load`](Self::load) with an explicit clock.
    #[instrument(name = "waypoint.history.load", skip(self), fields(document = %self.document))]
    pub fn load_at(&mut self, now: i64) -> &[HistoryEntry] {
        let loaded = match self.backend.read_document(&self.document) {
            Ok(Some(contents)) => parse_document(&contents).unwrap_or_else(|e| {
                warn!(error = %e, "History document unreadable, starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to open history document, starting empty");
                Vec::new()
            },
        };

        let (kept, result) = self.policy.apply(loaded, now);
        self.entries = kept;
        info!(
            entries = self.entries.len(),
            expired = result.removed,
            "Loaded teleport history"
        );
        &self.entries
    }

    /// Drops entries older than `max_age_days`. `0` deletes all history.
    pub fn trim(&mut self, max_age_days: u32) -> RetentionResult {
        self.trim_at(max_age_days, current_timestamp())
    }

    /// [`trim`](Self::trim) with an explicit clock.
    pub fn trim_at(&mut self, max_age_days: u32, now: i64) -> RetentionResult {
        let entries = std::mem::take(&mut self.entries);
        let (kept, result) = RetentionPolicy::new(max_age_days).apply(entries, now);
        self.entries = kept;
        result
    }

    /// Appends an entry in memory. Call [`save`](Self::save) to persist.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Rewrites the whole document, logging failures.
    pub fn save(&self) {
        if let Err(e) = self.try_save() {
            warn!(error = %e, document = %self.document, "Failed to save history");
        }
    }

    /// Rewrites the whole document.
    pub fn try_save(&self) -> Result<()> {
        let contents = render_document(&self.entries)?;
        self.backend.write_document(&self.document, &contents)?;
        metrics::counter!("history_store_writes_total").increment(1);
        debug!(entries = self.entries.len(), "Saved teleport history");
        Ok(())
    }

    /// Empties the history and saves the empty document.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.save();
    }

    /// Entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there is no history.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The retention policy applied on load.
    #[must_use]
    pub const fn policy(&self) -> RetentionPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SECONDS_PER_DAY;
    use crate::storage::MemoryBackend;

    const NOW: i64 = 1_700_000_000;

    fn store(backend: &Arc<MemoryBackend>, max_age: u32) -> PersistentHistoryStore {
        PersistentHistoryStore::new(backend.clone(), RetentionPolicy::new(max_age))
    }

    #[test]
    fn test_append_save_load() {
        let backend = Arc::new(MemoryBackend::new());
        let mut writer = store(&backend, 30);
        writer.append(HistoryEntry::new("A", "secondlife://A/1/1/1", NOW - 10));
        writer.append(HistoryEntry::new("B", "secondlife://B/1/1/1", NOW));
        writer.try_save().unwrap();

        let mut reader = store(&backend, 30);
        let names: Vec<_> = reader.load_at(NOW).iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_load_applies_retention() {
        let backend = Arc::new(MemoryBackend::new());
        let mut writer = store(&backend, 30);
        for days in [7, 2, 1, 0] {
            writer.append(HistoryEntry::new(
                format!("{days}d"),
                "secondlife://A/1/1/1",
                NOW - days * SECONDS_PER_DAY,
            ));
        }
        writer.save();

        let mut reader = store(&backend, 5);
        let names: Vec<_> = reader.load_at(NOW).iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["2d", "1d", "0d"]);
    }

    #[test]
    fn test_unparseable_document_loads_empty() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .write_document(TELEPORT_HISTORY_DOCUMENT, "<llsd>not json</llsd>")
            .unwrap();

        let mut reader = store(&backend, 30);
        assert!(reader.load_at(NOW).is_empty());
    }

    #[test]
    fn test_malformed_timestamps_are_skipped() {
        let backend = Arc::new(MemoryBackend::new());
        let doc = r#"{
            "version": 1,
            "entries": [
                {"name": "int", "url": "secondlife://A/1/1/1", "timestamp": 1699999000},
                {"name": "rfc", "url": "secondlife://B/1/1/1", "timestamp": "2023-11-14T22:00:00Z"},
                {"name": "bad", "url": "secondlife://C/1/1/1", "timestamp": "yesterday"},
                {"name": "missing", "url": "secondlife://D/1/1/1"}
            ]
        }"#;
        backend.write_document(TELEPORT_HISTORY_DOCUMENT, doc).unwrap();

        let mut reader = store(&backend, 30);
        let names: Vec<_> = reader.load_at(NOW).iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["int", "rfc"]);
    }

    #[test]
    fn test_trim_zero_deletes_all() {
        let backend = Arc::new(MemoryBackend::new());
        let mut history = store(&backend, 30);
        history.append(HistoryEntry::new("A", "secondlife://A/1/1/1", NOW));
        history.append(HistoryEntry::new("B", "secondlife://B/1/1/1", NOW));

        let result = history.trim_at(0, NOW);
        assert_eq!(result.removed, 2);
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear_persists_empty_document() {
        let backend = Arc::new(MemoryBackend::new());
        let mut history = store(&backend, 30);
        history.append(HistoryEntry::new("A", "secondlife://A/1/1/1", NOW));
        history.save();
        history.clear();

        let mut reader = store(&backend, 30);
        assert!(reader.load_at(NOW).is_empty());
        assert!(backend.exists(TELEPORT_HISTORY_DOCUMENT).unwrap());
    }

    #[test]
    fn test_custom_document_name() {
        let backend = Arc::new(MemoryBackend::new());
        let mut history = store(&backend, 30).with_document("alt_history");
        history.append(HistoryEntry::new("A", "secondlife://A/1/1/1", NOW));
        history.save();

        assert!(backend.exists("alt_history").unwrap());
        assert!(!backend.exists(TELEPORT_HISTORY_DOCUMENT).unwrap());
    }
}
