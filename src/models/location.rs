//! Location value types.

use super::{HistoryEntry, Slurl};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Region-local position in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionPosition {
    /// East-west offset.
    pub x: f32,
    /// North-south offset.
    pub y: f32,
    /// Altitude.
    pub z: f32,
}

impl RegionPosition {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Rounds to the integer coordinates carried by a SLURL.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn rounded(self) -> (i32, i32, i32) {
        (
            self.x.round() as i32,
            self.y.round() as i32,
            self.z.round() as i32,
        )
    }
}

impl fmt::Display for RegionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, z) = self.rounded();
        write!(f, "({x}, {y}, {z})")
    }
}

/// Landmark asset reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Wraps an existing UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A place the agent has been, or is about to go.
///
/// Equality is "same place": region name and region position only. Notes,
/// landmark asset and resolved url do not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    region_name: String,
    region_position: RegionPosition,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    asset_id: Option<AssetId>,
    #[serde(default)]
    resolved_url: Option<Slurl>,
}

impl LocationInfo {
    /// Creates a location with no notes, asset, or resolved url.
    #[must_use]
    pub fn new(region_name: impl Into<String>, region_position: RegionPosition) -> Self {
        Self {
            region_name: region_name.into(),
            region_position,
            notes: None,
            asset_id: None,
            resolved_url: None,
        }
    }

    /// Builds a location from a parsed SLURL, which is also its resolved url.
    #[must_use]
    pub fn from_slurl(slurl: &Slurl) -> Self {
        let (x, y, z) = slurl.coordinates();
        #[allow(clippy::cast_precision_loss)]
        let position = RegionPosition::new(x as f32, y as f32, z as f32);
        Self {
            resolved_url: Some(slurl.clone()),
            ..Self::new(slurl.region_name(), position)
        }
    }

    /// Builds a location from a persisted history entry.
    ///
    /// Entries whose url does not parse keep the entry name as region name
    /// and land at the region origin.
    #[must_use]
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        Slurl::parse(&entry.url).map_or_else(
            || Self::new(entry.name.clone(), RegionPosition::default()),
            |slurl| Self::from_slurl(&slurl),
        )
    }

    /// Attaches notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Attaches a landmark asset id.
    #[must_use]
    pub const fn with_asset_id(mut self, asset_id: AssetId) -> Self {
        self.asset_id = Some(asset_id);
        self
    }

    /// Region name.
    #[must_use]
    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    /// Region-local position.
    #[must_use]
    pub const fn region_position(&self) -> RegionPosition {
        self.region_position
    }

    /// Free-form notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Landmark asset id, if this location came from a landmark.
    #[must_use]
    pub const fn asset_id(&self) -> Option<AssetId> {
        self.asset_id
    }

    /// Canonical navigable address, once resolved.
    #[must_use]
    pub const fn resolved_url(&self) -> Option<&Slurl> {
        self.resolved_url.as_ref()
    }

    /// Fills in the resolved url.
    ///
    /// Returns `false` and leaves the value untouched if it was already set.
    pub fn set_resolved_url(&mut self, url: Slurl) -> bool {
        if self.resolved_url.is_some() {
            return false;
        }
        self.resolved_url = Some(url);
        true
    }

    /// Returns the resolved url, or one built from the region and position.
    #[must_use]
    pub fn slurl(&self) -> Slurl {
        self.resolved_url.clone().unwrap_or_else(|| {
            let (x, y, z) = self.region_position.rounded();
            Slurl::new(&self.region_name, x, y, z)
        })
    }

    /// Display title used in history lists: `Region (x, y, z)`.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} {}", self.region_name, self.region_position)
    }
}

impl PartialEq for LocationInfo {
    fn eq(&self, other: &Self) -> bool {
        self.region_name == other.region_name && self.region_position == other.region_position
    }
}

impl fmt::Display for LocationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_place_ignores_notes_and_asset() {
        let a = LocationInfo::new("Ahern", RegionPosition::new(128.0, 128.0, 20.0));
        let b = a
            .clone()
            .with_notes("home")
            .with_asset_id(AssetId::new(Uuid::new_v4()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_position_is_exact() {
        let a = LocationInfo::new("Ahern", RegionPosition::new(128.0, 128.0, 20.0));
        let b = LocationInfo::new("Ahern", RegionPosition::new(128.0, 128.0, 20.5));
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolved_url_set_once() {
        let mut loc = LocationInfo::new("Ahern", RegionPosition::new(10.0, 20.0, 30.0));
        assert!(loc.set_resolved_url(Slurl::new("Ahern", 10, 20, 30)));
        assert!(!loc.set_resolved_url(Slurl::new("Morris", 1, 2, 3)));
        assert_eq!(loc.resolved_url().map(Slurl::region_name), Some("Ahern"));
    }

    #[test]
    fn test_from_entry_with_bad_url() {
        let entry = HistoryEntry::new("Somewhere", "not a url", 0);
        let loc = LocationInfo::from_entry(&entry);
        assert_eq!(loc.region_name(), "Somewhere");
        assert!(loc.resolved_url().is_none());
    }

    #[test]
    fn test_title() {
        let loc = LocationInfo::new("Da Boom", RegionPosition::new(127.6, 3.2, 22.0));
        assert_eq!(loc.title(), "Da Boom (128, 3, 22)");
    }
}
