//! Named-region lookup.
//!
//! Maps a region name to its grid handle. Lookups are blocking; the
//! [`LocationResolver`](super::LocationResolver) runs them off the owner
//! thread.

use super::http::{HttpSettings, build_http_client, request_error, status_error};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::instrument;

/// Metres per region edge.
pub const REGION_WIDTH: u64 = 256;

/// Global grid handle of a region: the region's south-west corner in global
/// metres, x in the high 32 bits and y in the low 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionHandle(u64);

impl RegionHandle {
    /// Wraps a raw handle.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Builds a handle from grid coordinates (in regions).
    #[must_use]
    pub const fn from_grid(grid_x: u32, grid_y: u32) -> Self {
        let x = grid_x as u64 * REGION_WIDTH;
        let y = grid_y as u64 * REGION_WIDTH;
        Self((x << 32) | (y & 0xFFFF_FFFF))
    }

    /// Grid coordinates (in regions).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn grid_coordinates(self) -> (u32, u32) {
        let x = (self.0 >> 32) / REGION_WIDTH;
        let y = (self.0 & 0xFFFF_FFFF) / REGION_WIDTH;
        (x as u32, y as u32)
    }

    /// Raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.grid_coordinates();
        write!(f, "{x},{y}")
    }
}

/// A region found by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMatch {
    /// Canonical region name as the grid spells it.
    pub name: String,
    /// Grid handle.
    pub handle: RegionHandle,
}

impl RegionMatch {
    /// Creates a match.
    #[must_use]
    pub fn new(name: impl Into<String>, handle: RegionHandle) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }
}

/// Looks up regions by name.
pub trait RegionLookup: Send + Sync {
    /// Returns the region called `name`, or `None` if the grid has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup service cannot be reached.
    fn lookup_region(&self, name: &str) -> Result<Option<RegionMatch>>;
}

/// Fixed, case-insensitive region table.
#[derive(Debug, Clone, Default)]
pub struct StaticRegionLookup {
    regions: HashMap<String, RegionMatch>,
}

impl StaticRegionLookup {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a region.
    #[must_use]
    pub fn with_region(mut self, name: impl Into<String>, handle: RegionHandle) -> Self {
        self.insert(RegionMatch::new(name, handle));
        self
    }

    /// Adds or replaces a region.
    pub fn insert(&mut self, region: RegionMatch) {
        self.regions.insert(region.name.to_lowercase(), region);
    }

    /// Number of known regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if no regions are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl RegionLookup for StaticRegionLookup {
    fn lookup_region(&self, name: &str) -> Result<Option<RegionMatch>> {
        Ok(self.regions.get(&name.trim().to_lowercase()).cloned())
    }
}

#[derive(Debug, Deserialize)]
struct RegionRecord {
    name: String,
    grid_x: u32,
    grid_y: u32,
}

/// Region lookup against a grid map service.
///
/// Issues `GET {endpoint}/regions?name=<name>` and expects
/// `{"name": "...", "grid_x": 1000, "grid_y": 1000}`. A 404 means no match.
pub struct HttpRegionLookup {
    endpoint: String,
    settings: HttpSettings,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpRegionLookup {
    /// Creates a lookup for `endpoint`. The client is built on first use.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            settings: HttpSettings::default(),
            client: OnceLock::new(),
        }
    }

    /// Sets timeouts.
    #[must_use]
    pub fn with_settings(mut self, settings: HttpSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self) -> &reqwest::blocking::Client {
        self.client.get_or_init(|| build_http_client(self.settings))
    }
}

impl RegionLookup for HttpRegionLookup {
    #[instrument(name = "waypoint.region.lookup", skip(self), fields(endpoint = %self.endpoint))]
    fn lookup_region(&self, name: &str) -> Result<Option<RegionMatch>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("empty region name".to_string()));
        }

        let response = self
            .client()
            .get(format!("{}/regions", self.endpoint))
            .query(&[("name", name)])
            .send()
            .map_err(|e| request_error("region_lookup", &e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error("region_lookup", response));
        }

        let record: RegionRecord = response.json().map_err(|e| Error::OperationFailed {
            operation: "region_lookup_response".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Some(RegionMatch::new(
            record.name,
            RegionHandle::from_grid(record.grid_x, record.grid_y),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1000, 1000; "typical mainland")]
    #[test_case(0, 0; "origin")]
    #[test_case(255, 16; "small")]
    fn test_handle_grid_roundtrip(x: u32, y: u32) {
        let handle = RegionHandle::from_grid(x, y);
        assert_eq!(handle.grid_coordinates(), (x, y));
    }

    #[test]
    fn test_handle_layout() {
        let handle = RegionHandle::from_grid(1, 2);
        assert_eq!(handle.as_u64(), (256_u64 << 32) | 512);
        assert_eq!(handle.to_string(), "1,2");
    }

    #[test]
    fn test_static_lookup_is_case_insensitive() {
        let lookup = StaticRegionLookup::new().with_region("Ahern", RegionHandle::from_grid(997, 1002));

        let found = lookup.lookup_region("  ahern ").unwrap();
        assert_eq!(found.map(|r| r.name), Some("Ahern".to_string()));
        assert!(lookup.lookup_region("Nowhere").unwrap().is_none());
    }

    #[test]
    fn test_http_lookup_trims_endpoint() {
        let lookup = HttpRegionLookup::new("https://grid.example/api/");
        assert_eq!(lookup.endpoint(), "https://grid.example/api");
    }

    #[test]
    fn test_http_lookup_rejects_empty_name() {
        let lookup = HttpRegionLookup::new("https://grid.example");
        assert!(matches!(
            lookup.lookup_region("   "),
            Err(Error::InvalidInput(_))
        ));
    }
}
