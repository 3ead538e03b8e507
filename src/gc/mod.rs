//! Garbage collection for history documents.
//!
//! Teleport history and typed-location history both age out entries with
//! the same [`RetentionPolicy`]. A pass never edits a list in place; it
//! rebuilds the surviving entries in order.
//!
//! ```rust,ignore
//! use waypoint::gc::RetentionPolicy;
//!
//! let policy = RetentionPolicy::new(config.history.max_history_age_days);
//! let (kept, result) = policy.apply(entries, waypoint::current_timestamp());
//! tracing::info!("{}", result.summary());
//! ```

mod retention;

pub use retention::{
    Aged, DEFAULT_MAX_HISTORY_AGE_DAYS, MAX_HISTORY_AGE_ENV, RetentionPolicy, RetentionResult,
    age_in_days,
};
