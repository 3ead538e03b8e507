//! Address-bar location history.
//!
//! The dropdown under the address bar lists places the user typed, teleported
//! to, or opened from a landmark. It is separate from teleport history: it
//! has its own document, its own capacity and a shorter retention age.

use crate::gc::{Aged, RetentionPolicy};
use crate::storage::HistoryPersistence;
use crate::{Error, Result, current_timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Document name for the address-bar history.
pub const TYPED_LOCATIONS_DOCUMENT: &str = "typed_locations";

/// Default number of address-bar entries.
pub const DEFAULT_MAX_TYPED_LOCATIONS: usize = 50;

/// Default address-bar retention in days.
pub const DEFAULT_ADDRESS_BAR_MAX_AGE_DAYS: u32 = 7;

/// How a location reached the address bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// Typed by the user.
    #[default]
    Typed,
    /// Arrived at by teleport.
    Teleport,
    /// Opened from a landmark.
    Landmark,
}

impl LocationKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Typed => "typed",
            Self::Teleport => "teleport",
            Self::Landmark => "landmark",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One address-bar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedLocation {
    /// Text shown in the dropdown.
    pub title: String,
    /// Origin of the entry.
    #[serde(default)]
    pub kind: LocationKind,
    /// Last use (Unix epoch seconds).
    pub timestamp: i64,
}

impl Aged for TypedLocation {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TypedDocument {
    #[serde(default)]
    entries: Vec<TypedLocation>,
}

/// Bounded, age-trimmed address-bar history.
pub struct TypedLocationHistory {
    backend: Arc<dyn HistoryPersistence>,
    capacity: usize,
    policy: RetentionPolicy,
    entries: Vec<TypedLocation>,
}

impl TypedLocationHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new(backend: Arc<dyn HistoryPersistence>, capacity: usize, max_age_days: u32) -> Self {
        Self {
            backend,
            capacity,
            policy: RetentionPolicy::new(max_age_days),
            entries: Vec::new(),
        }
    }

    /// Reads the document, dropping expired entries.
    pub fn load(&mut self) -> &[TypedLocation] {
        self.load_at(current_timestamp())
    }

    /// [`load`](Self::load) with an explicit clock.
    #[instrument(name = "waypoint.typed.load", skip(self))]
    pub fn load_at(&mut self, now: i64) -> &[TypedLocation] {
        let loaded = match self.backend.read_document(TYPED_LOCATIONS_DOCUMENT) {
            Ok(Some(contents)) => serde_json::from_str::<TypedDocument>(&contents)
                .map(|doc| doc.entries)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Address-bar history unreadable, starting empty");
                    Vec::new()
                }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to open address-bar history, starting empty");
                Vec::new()
            },
        };

        self.entries = loaded;
        self.enforce_limits(now);
        info!(entries = self.entries.len(), "Loaded address-bar history");
        &self.entries
    }

    /// Records a use of `title`. Returns `false` for blank titles.
    ///
    /// A title already present moves to the newest position with the new
    /// kind and timestamp.
    pub fn add(&mut self, title: &str, kind: LocationKind, now: i64) -> bool {
        let title = title.trim();
        if title.is_empty() || self.capacity == 0 {
            return false;
        }

        self.entries
            .retain(|existing| !existing.title.eq_ignore_ascii_case(title));
        self.entries.push(TypedLocation {
            title: title.to_string(),
            kind,
            timestamp: now,
        });
        self.enforce_limits(now);
        debug!(kind = %kind, entries = self.entries.len(), "Recorded address-bar entry");
        true
    }

    fn enforce_limits(&mut self, now: i64) {
        let entries = std::mem::take(&mut self.entries);
        let (mut kept, _) = self.policy.apply(entries, now);
        if kept.len() > self.capacity {
            kept.drain(..kept.len() - self.capacity);
        }
        self.entries = kept;
    }

    /// Entries whose title contains `filter` (case-insensitive), newest first.
    #[must_use]
    pub fn matching(&self, filter: &str) -> Vec<&TypedLocation> {
        let filter = filter.trim().to_lowercase();
        self.entries
            .iter()
            .rev()
            .filter(|entry| filter.is_empty() || entry.title.to_lowercase().contains(&filter))
            .collect()
    }

    /// Rewrites the document, logging failures.
    pub fn save(&self) {
        if let Err(e) = self.try_save() {
            warn!(error = %e, "Failed to save address-bar history");
        }
    }

    /// Rewrites the document.
    pub fn try_save(&self) -> Result<()> {
        let document = TypedDocument {
            entries: self.entries.clone(),
        };
        let contents =
            serde_json::to_string_pretty(&document).map_err(|e| Error::OperationFailed {
                operation: "serialize_typed_locations".to_string(),
                cause: e.to_string(),
            })?;
        self.backend
            .write_document(TYPED_LOCATIONS_DOCUMENT, &contents)
    }

    /// Empties the history and saves.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.save();
    }

    /// Entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[TypedLocation] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SECONDS_PER_DAY;
    use crate::storage::MemoryBackend;

    const NOW: i64 = 1_700_000_000;

    fn titles(history: &TypedLocationHistory) -> Vec<&str> {
        history.entries().iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn test_add_dedupes_and_moves_to_newest() {
        let mut history = TypedLocationHistory::new(Arc::new(MemoryBackend::new()), 10, 7);
        history.add("Ahern", LocationKind::Typed, NOW - 20);
        history.add("Morris", LocationKind::Teleport, NOW - 10);
        history.add("ahern", LocationKind::Landmark, NOW);

        assert_eq!(titles(&history), vec!["Morris", "ahern"]);
        assert_eq!(history.entries()[1].kind, LocationKind::Landmark);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut history = TypedLocationHistory::new(Arc::new(MemoryBackend::new()), 2, 7);
        for (i, title) in ["A", "B", "C"].iter().enumerate() {
            history.add(title, LocationKind::Typed, NOW + i as i64);
        }
        assert_eq!(titles(&history), vec!["B", "C"]);
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut history = TypedLocationHistory::new(Arc::new(MemoryBackend::new()), 10, 7);
        assert!(!history.add("   ", LocationKind::Typed, NOW));
        assert!(history.is_empty());
    }

    #[test]
    fn test_matching_newest_first() {
        let mut history = TypedLocationHistory::new(Arc::new(MemoryBackend::new()), 10, 7);
        history.add("Ahern", LocationKind::Typed, NOW - 2);
        history.add("Morris", LocationKind::Typed, NOW - 1);
        history.add("Da Boom Hernia", LocationKind::Typed, NOW);

        let found: Vec<_> = history.matching("HERN").iter().map(|e| e.title.as_str()).collect();
        assert_eq!(found, vec!["Da Boom Hernia", "Ahern"]);
        assert_eq!(history.matching("").len(), 3);
    }

    #[test]
    fn test_save_load_applies_age_limit() {
        let backend = Arc::new(MemoryBackend::new());
        let mut writer = TypedLocationHistory::new(backend.clone(), 10, 30);
        writer.add("Old", LocationKind::Typed, NOW - 10 * SECONDS_PER_DAY);
        writer.add("Fresh", LocationKind::Teleport, NOW - SECONDS_PER_DAY);
        writer.try_save().unwrap();

        let mut reader = TypedLocationHistory::new(backend, 10, 7);
        let loaded: Vec<_> = reader.load_at(NOW).iter().map(|e| e.title.clone()).collect();
        assert_eq!(loaded, vec!["Fresh"]);
    }

    #[test]
    fn test_clear_persists() {
        let backend = Arc::new(MemoryBackend::new());
        let mut history = TypedLocationHistory::new(backend.clone(), 10, 7);
        history.add("Ahern", LocationKind::Typed, NOW);
        history.save();
        history.clear();

        let mut reader = TypedLocationHistory::new(backend, 10, 7);
        assert!(reader.load_at(NOW).is_empty());
    }
}
