//! Navigation inputs and events.

use super::{LocationInfo, Slurl};

/// Teleport state reported by the agent/session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeleportState {
    /// No teleport in progress.
    #[default]
    None,
    /// A teleport was requested.
    Requested,
    /// The agent is moving to the destination region.
    Moving,
    /// The agent arrived.
    Arriving,
    /// The teleport failed or was cancelled.
    Failed,
}

impl TeleportState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Requested => "requested",
            Self::Moving => "moving",
            Self::Arriving => "arriving",
            Self::Failed => "failed",
        }
    }
}

/// A request to change the current location in the history stacks.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    /// A brand-new destination (typed, landmark, map).
    Direct(LocationInfo),
    /// Back button.
    Back,
    /// Forward button.
    Forward,
    /// A location picked from the history dropdown.
    HistoryPick(LocationInfo),
}

impl Navigation {
    /// Short name used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Back => "back",
            Self::Forward => "forward",
            Self::HistoryPick(_) => "history_pick",
        }
    }
}

/// Events emitted by the navigation history service.
#[derive(Debug, Clone)]
pub enum NavigationEvent {
    /// The current location changed.
    LocationChanged {
        /// New current location.
        location: LocationInfo,
        /// `Navigation::kind` of the move.
        via: &'static str,
    },
    /// History lists changed and should be rebuilt.
    HistoryChanged,
    /// History was cleared explicitly.
    HistoryCleared,
    /// A teleport was handed to the teleporter.
    TeleportRequested {
        /// Destination.
        url: Slurl,
    },
    /// An address could not be resolved and was sent to search.
    SearchRequested {
        /// The unresolved text.
        query: String,
    },
}

impl NavigationEvent {
    /// Returns the event type as a string.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::LocationChanged { .. } => "location_changed",
            Self::HistoryChanged => "history_changed",
            Self::HistoryCleared => "history_cleared",
            Self::TeleportRequested { .. } => "teleport_requested",
            Self::SearchRequested { .. } => "search_requested",
        }
    }
}
