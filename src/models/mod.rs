//! Data models for waypoint.
//!
//! Value types shared by the history stacks, the persistent store and the
//! resolver.

mod events;
mod history;
mod location;
pub mod slurl;

pub use events::{Navigation, NavigationEvent, TeleportState};
pub use history::{AgeBucket, HistoryEntry};
pub use location::{AssetId, LocationInfo, RegionPosition};
pub use slurl::Slurl;
