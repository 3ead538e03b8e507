//! Persisted history records and display buckets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A visited place as written to the history document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Display name (usually `Region (x, y, z)`).
    pub name: String,
    /// Navigable address.
    pub url: String,
    /// Visit time (Unix epoch seconds).
    pub timestamp: i64,
}

impl HistoryEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timestamp,
        }
    }

    /// Builds an entry for a location visited at `timestamp`.
    #[must_use]
    pub fn for_location(location: &super::LocationInfo, timestamp: i64) -> Self {
        Self::new(location.title(), location.slurl().to_string(), timestamp)
    }
}

/// "Days ago" group used by history lists.
///
/// Ordered newest first so a `BTreeMap` keyed by bucket iterates in display
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBucket {
    /// Visited today.
    Today,
    /// Visited yesterday.
    Yesterday,
    /// Visited two to five days ago.
    DaysAgo(u8),
    /// Anything older.
    Older,
}

impl AgeBucket {
    /// Oldest age, in days, that still gets its own `DaysAgo` bucket.
    pub const LAST_DAYS_AGO: i64 = 5;

    /// Maps an age in whole days to its bucket.
    ///
    /// Age 6 falls in `Older`, not `DaysAgo(6)`; named buckets stop at
    /// [`Self::LAST_DAYS_AGO`].
    #[must_use]
    pub fn from_age_days(age_days: i64) -> Self {
        match age_days {
            i64::MIN..=0 => Self::Today,
            1 => Self::Yesterday,
            2..=Self::LAST_DAYS_AGO => Self::DaysAgo(u8::try_from(age_days).unwrap_or(u8::MAX)),
            _ => Self::Older,
        }
    }

    /// Human readable label.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Today => "Today".to_string(),
            Self::Yesterday => "Yesterday".to_string(),
            Self::DaysAgo(2) => "Two Days Ago".to_string(),
            Self::DaysAgo(3) => "Three Days Ago".to_string(),
            Self::DaysAgo(4) => "Four Days Ago".to_string(),
            Self::DaysAgo(5) => "Five Days Ago".to_string(),
            Self::DaysAgo(n) => format!("{n} Days Ago"),
            Self::Older => "Older".to_string(),
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(-3, AgeBucket::Today; "future clamps to today")]
    #[test_case(0, AgeBucket::Today; "today")]
    #[test_case(1, AgeBucket::Yesterday; "yesterday")]
    #[test_case(2, AgeBucket::DaysAgo(2); "two")]
    #[test_case(5, AgeBucket::DaysAgo(5); "five")]
    #[test_case(6, AgeBucket::Older; "six")]
    #[test_case(400, AgeBucket::Older; "past retention")]
    fn test_from_age_days(age: i64, expected: AgeBucket) {
        assert_eq!(AgeBucket::from_age_days(age), expected);
    }

    #[test]
    fn test_bucket_order_is_newest_first() {
        let mut buckets = vec![
            AgeBucket::Older,
            AgeBucket::DaysAgo(3),
            AgeBucket::Today,
            AgeBucket::DaysAgo(2),
            AgeBucket::Yesterday,
        ];
        buckets.sort();
        assert_eq!(
            buckets,
            vec![
                AgeBucket::Today,
                AgeBucket::Yesterday,
                AgeBucket::DaysAgo(2),
                AgeBucket::DaysAgo(3),
                AgeBucket::Older,
            ]
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(AgeBucket::DaysAgo(2).label(), "Two Days Ago");
        assert_eq!(AgeBucket::Older.to_string(), "Older");
    }
}
