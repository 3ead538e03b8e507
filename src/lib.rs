//! # Waypoint
//!
//! Navigation history and location resolution for virtual-world clients.
//!
//! Waypoint keeps the back/forward teleport history of a navigation bar,
//! persists visited places in an age-trimmed history document, and resolves
//! typed addresses into navigable locations.
//!
//! ## Features
//!
//! - Browser-style back/forward stacks with "jump into history" support
//! - Persistent teleport history with age-based retention
//! - Recent places and "days ago" display bucketing
//! - Asynchronous region-name resolution with stale-reply suppression
//! - Address-bar typed location history
//! - Remote parcel info requests for landmark panels
//!
//! ## Example
//!
//! ```rust,ignore
//! use waypoint::{NavigationHistoryService, TeleportState, WaypointConfig};
//!
//! let mut service = NavigationHistoryService::builder(WaypointConfig::load_default())
//!     .teleporter(agent)
//!     .build();
//! service.start();
//! service.commit_address("secondlife://Ahern/128/128/20");
//! service.on_teleport_state_changed(TeleportState::Arriving, Some("secondlife://Ahern/128/128/20"));
//! assert!(service.stacks().current().is_some());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod gc;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::{HistoryConfig, WaypointConfig};
pub use models::{
    AgeBucket, AssetId, HistoryEntry, LocationInfo, Navigation, NavigationEvent, RegionPosition,
    Slurl, TeleportState,
};
pub use services::{
    LocationResolver, NavigationHistoryService, NavigationHistoryStacks, ParcelInfoClient,
    ParcelInfoProcessor, PersistentHistoryStore, RecentPlacesList, RegionLookup, ResolveOutcome,
    Resolution, SearchFacility, Teleporter, TypedLocationHistory, bucket_by_age,
};
pub use storage::{FilesystemBackend, HistoryPersistence, MemoryBackend};

/// Error type for waypoint operations.
///
/// Most history operations are best effort and log instead of returning
/// these; the variants surface from configuration loading, storage backends
/// and collaborator clients.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed addresses, unsafe document names, bad config values |
/// | `OperationFailed` | I/O errors, HTTP failures, (de)serialization failures |
/// | `NotFound` | A lookup collaborator has no record for the requested key |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Shorthand for [`Error::OperationFailed`].
    pub fn operation(operation: &str, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for waypoint operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// ```rust
/// use waypoint::current_timestamp;
///
/// assert!(current_timestamp() > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("bad address".to_string());
        assert_eq!(err.to_string(), "invalid input: bad address");

        let err = Error::operation("write_history", "disk full");
        assert_eq!(err.to_string(), "operation 'write_history' failed: disk full");

        let err = Error::NotFound("region Ahern".to_string());
        assert_eq!(err.to_string(), "not found: region Ahern");
    }
}
