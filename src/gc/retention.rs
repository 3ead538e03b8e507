//! Age-based retention for history lists.
//!
//! Entries older than the configured maximum age are dropped. Every pass is
//! a full recompute: the surviving list is rebuilt from scratch in one
//! filter pass rather than erased from in place.
//!
//! # Configuration
//!
//! Retention can be configured via:
//! - Environment variable: `WAYPOINT_MAX_HISTORY_AGE_DAYS` (default: 30)
//! - Config file: `[history] max_history_age_days = 30`
//!
//! A maximum age of `0` means "delete all history".
//!
//! # Example
//!
//! ```rust
//! use waypoint::gc::RetentionPolicy;
//! use waypoint::HistoryEntry;
//!
//! let now = 10 * 86_400;
//! let entries = vec![
//!     HistoryEntry::new("old", "secondlife://Old/1/1/1", 0),
//!     HistoryEntry::new("new", "secondlife://New/1/1/1", now),
//! ];
//! let (kept, result) = RetentionPolicy::new(5).apply(entries, now);
//! assert_eq!(kept.len(), 1);
//! assert_eq!(result.removed, 1);
//! ```

use crate::SECONDS_PER_DAY;
use crate::models::HistoryEntry;
use std::time::{Duration, Instant};
use tracing::debug;

/// Environment variable for the teleport history retention period in days.
///
/// Read by the config layer; see `WaypointConfig::with_env_overrides`.
pub const MAX_HISTORY_AGE_ENV: &str = "WAYPOINT_MAX_HISTORY_AGE_DAYS";

/// Default retention period in days.
pub const DEFAULT_MAX_HISTORY_AGE_DAYS: u32 = 30;

/// Safely converts Duration to milliseconds as u64, capping at `u64::MAX`.
#[inline]
fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Age of a timestamp in whole days, rounded up.
///
/// `ceil((now - timestamp) / 86400)`; timestamps in the future yield zero
/// or a negative count.
#[must_use]
pub const fn age_in_days(now: i64, timestamp: i64) -> i64 {
    let diff = now.saturating_sub(timestamp);
    let days = diff / SECONDS_PER_DAY;
    if diff % SECONDS_PER_DAY > 0 {
        days + 1
    } else {
        days
    }
}

/// Anything with a visit time that retention can age.
pub trait Aged {
    /// Visit time (Unix epoch seconds).
    fn timestamp(&self) -> i64;
}

impl Aged for HistoryEntry {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Result of a retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionResult {
    /// Entries examined.
    pub checked: usize,
    /// Entries dropped.
    pub removed: usize,
    /// Duration of the pass in milliseconds.
    pub duration_ms: u64,
}

impl RetentionResult {
    /// Returns `true` if anything was dropped.
    #[must_use]
    pub const fn has_removed(&self) -> bool {
        self.removed > 0
    }

    /// Returns a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.removed == 0 {
            format!("No expired entries ({} checked)", self.checked)
        } else {
            format!(
                "Removed {} of {} entries in {}ms",
                self.removed, self.checked, self.duration_ms
            )
        }
    }
}

/// Maximum-age retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum age in days; `0` deletes everything.
    pub max_age_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_AGE_DAYS)
    }
}

impl RetentionPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_age_days: u32) -> Self {
        Self { max_age_days }
    }

    /// Returns `true` if an entry of this timestamp should be dropped.
    #[must_use]
    pub const fn is_expired(&self, now: i64, timestamp: i64) -> bool {
        self.max_age_days == 0 || age_in_days(now, timestamp) > self.max_age_days as i64
    }

    /// Rebuilds the surviving list in one pass, preserving relative order.
    pub fn apply<T: Aged>(&self, entries: Vec<T>, now: i64) -> (Vec<T>, RetentionResult) {
        let start = Instant::now();
        let checked = entries.len();

        let kept: Vec<T> = entries
            .into_iter()
            .filter(|entry| !self.is_expired(now, entry.timestamp()))
            .collect();

        let result = RetentionResult {
            checked,
            removed: checked - kept.len(),
            duration_ms: duration_to_millis(start.elapsed()),
        };

        if result.has_removed() {
            metrics::counter!("history_retention_removed_total")
                .increment(result.removed as u64);
            debug!(
                max_age_days = self.max_age_days,
                checked = result.checked,
                removed = result.removed,
                "Applied history retention"
            );
        }

        (kept, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const NOW: i64 = 1_700_000_000;

    fn entry_aged(seconds: i64) -> HistoryEntry {
        HistoryEntry::new(
            format!("aged {seconds}"),
            "secondlife://Ahern/1/1/1",
            NOW - seconds,
        )
    }

    #[test_case(0, 0; "now")]
    #[test_case(1, 1; "one second rounds up")]
    #[test_case(SECONDS_PER_DAY, 1; "exactly one day")]
    #[test_case(SECONDS_PER_DAY + 1, 2; "just over one day")]
    #[test_case(7 * SECONDS_PER_DAY, 7; "one week")]
    #[test_case(-SECONDS_PER_DAY, -1; "future")]
    fn test_age_in_days(age_seconds: i64, expected: i64) {
        assert_eq!(age_in_days(NOW, NOW - age_seconds), expected);
    }

    #[test]
    fn test_apply_keeps_order_and_drops_old() {
        let entries = vec![
            entry_aged(7 * SECONDS_PER_DAY),
            entry_aged(2 * SECONDS_PER_DAY),
            entry_aged(SECONDS_PER_DAY),
            entry_aged(0),
        ];

        let (kept, result) = RetentionPolicy::new(5).apply(entries, NOW);

        assert_eq!(result.checked, 4);
        assert_eq!(result.removed, 1);
        let names: Vec<_> = kept.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                format!("aged {}", 2 * SECONDS_PER_DAY),
                format!("aged {SECONDS_PER_DAY}"),
                "aged 0".to_string(),
            ]
        );
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let policy = RetentionPolicy::new(5);
        assert!(!policy.is_expired(NOW, NOW - 5 * SECONDS_PER_DAY));
        assert!(policy.is_expired(NOW, NOW - 5 * SECONDS_PER_DAY - 1));
    }

    #[test]
    fn test_zero_deletes_everything() {
        let entries = vec![entry_aged(0), entry_aged(-100)];
        let (kept, result) = RetentionPolicy::new(0).apply(entries, NOW);
        assert!(kept.is_empty());
        assert_eq!(result.removed, 2);
        assert!(result.summary().contains("Removed 2 of 2"));
    }

    #[test]
    fn test_summary_when_nothing_removed() {
        let (_, result) = RetentionPolicy::new(5).apply(vec![entry_aged(0)], NOW);
        assert!(!result.has_removed());
        assert_eq!(result.summary(), "No expired entries (1 checked)");
    }
}
