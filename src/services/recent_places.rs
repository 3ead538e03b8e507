//! Recently visited places.
//!
//! A bounded list keyed by url. Insertion order is oldest first; once full,
//! the oldest place is evicted. Revisiting a place moves it to the newest
//! slot instead of adding a duplicate. A capacity of zero disables
//! tracking entirely.

use crate::models::{HistoryEntry, LocationInfo};
use std::collections::VecDeque;

/// Default number of recent places kept.
pub const DEFAULT_MAX_RECENT_PLACES: usize = 20;

/// Bounded FIFO of recently visited places.
#[derive(Debug, Clone)]
pub struct RecentPlacesList {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for RecentPlacesList {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECENT_PLACES)
    }
}

impl RecentPlacesList {
    /// Creates an empty list holding at most `capacity` places.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Rebuilds the list from history, oldest first.
    #[must_use]
    pub fn from_history(history: &[HistoryEntry], capacity: usize) -> Self {
        let mut list = Self::new(capacity);
        list.rebuild(history);
        list
    }

    /// Replaces the contents with the newest places from `history`.
    pub fn rebuild(&mut self, history: &[HistoryEntry]) {
        self.entries.clear();
        for entry in history {
            self.add(entry.clone());
        }
    }

    /// Records a visit. Returns the evicted place, if any.
    pub fn add(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        if !self.is_enabled() {
            return None;
        }

        self.entries.retain(|existing| existing.url != entry.url);
        self.entries.push_back(entry);

        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Returns `false` when the capacity is zero.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Places, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Places as locations, newest first, for display.
    #[must_use]
    pub fn locations(&self) -> Vec<LocationInfo> {
        self.entries
            .iter()
            .rev()
            .map(LocationInfo::from_entry)
            .collect()
    }

    /// Number of places held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of places.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes all places.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, ts: i64) -> HistoryEntry {
        HistoryEntry::new(name, format!("secondlife://{name}/128/128/20"), ts)
    }

    fn names(list: &RecentPlacesList) -> Vec<&str> {
        list.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_fifo_eviction() {
        let mut list = RecentPlacesList::new(3);
        assert!(list.add(place("P1", 1)).is_none());
        list.add(place("P2", 2));
        list.add(place("P3", 3));
        let evicted = list.add(place("P4", 4));

        assert_eq!(evicted.map(|e| e.name), Some("P1".to_string()));
        assert_eq!(names(&list), vec!["P2", "P3", "P4"]);
    }

    #[test]
    fn test_revisit_moves_to_newest() {
        let mut list = RecentPlacesList::new(3);
        list.add(place("P1", 1));
        list.add(place("P2", 2));
        list.add(place("P1", 3));
        assert_eq!(names(&list), vec!["P2", "P1"]);
    }

    #[test]
    fn test_huge_capacity_does_not_preallocate() {
        let mut list = RecentPlacesList::new(usize::MAX);
        assert!(list.is_enabled());
        list.add(HistoryEntry::new("A", "secondlife://A/1/1/1", 1));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let mut list = RecentPlacesList::new(0);
        assert!(!list.is_enabled());
        list.add(place("P1", 1));
        assert!(list.is_empty());
    }

    #[test]
    fn test_from_history_keeps_newest() {
        let history = vec![place("A", 1), place("B", 2), place("C", 3), place("D", 4)];
        let list = RecentPlacesList::from_history(&history, 2);
        assert_eq!(names(&list), vec!["C", "D"]);

        let display: Vec<_> = list
            .locations()
            .iter()
            .map(|l| l.region_name().to_string())
            .collect();
        assert_eq!(display, vec!["D", "C"]);
    }
}
