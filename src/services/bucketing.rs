//! "Days ago" grouping for history lists.

use crate::gc::age_in_days;
use crate::models::{AgeBucket, HistoryEntry, LocationInfo};
use chrono::{Local, TimeZone};
use std::collections::BTreeMap;

/// Buckets history entries by age relative to `now`.
///
/// The age of an entry is `ceil((now - timestamp) / 86400)` days. Order
/// inside each bucket follows the input order. The transform is pure: the
/// same entries and `now` always give the same buckets.
///
/// Display callers pass [`start_of_day`] so that "Today" means the
/// current calendar day.
#[must_use]
pub fn bucket_by_age(entries: &[HistoryEntry], now: i64) -> BTreeMap<AgeBucket, Vec<LocationInfo>> {
    let mut buckets: BTreeMap<AgeBucket, Vec<LocationInfo>> = BTreeMap::new();
    for entry in entries {
        let bucket = AgeBucket::from_age_days(age_in_days(now, entry.timestamp));
        buckets
            .entry(bucket)
            .or_default()
            .push(LocationInfo::from_entry(entry));
    }
    buckets
}

/// Local midnight at the start of the day containing `now`.
///
/// Falls back to `now` itself when the local time zone has no such instant.
#[must_use]
pub fn start_of_day(now: i64) -> i64 {
    Local
        .timestamp_opt(now, 0)
        .single()
        .and_then(|dt| dt.date_naive().and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map_or(now, |midnight| midnight.timestamp())
}
