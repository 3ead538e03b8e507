//! Direct structured location URLs (SLURLs).
//!
//! A SLURL names a region and integer region coordinates. The accepted
//! spellings are:
//!
//! - `secondlife://Region%20Name/x/y/z`
//! - `secondlife:///app/teleport/Region/x/y/z`
//! - `http(s)://maps.secondlife.com/secondlife/Region/x/y/z`
//! - `http(s)://slurl.com/secondlife/Region/x/y/z`
//!
//! Coordinates are optional; missing ones default to the region centre.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Host prefix used for the canonical form.
pub const CANONICAL_PREFIX: &str = "https://maps.secondlife.com/secondlife/";

/// Default x/y when a SLURL omits coordinates.
pub const REGION_CENTRE: i32 = 128;

const MAX_XY: i32 = 255;
const MAX_Z: i32 = 4096;

static SLURL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*
        (?:
            secondlife:///?(?:app/teleport/)?
          | (?:https?://)?(?:maps\.secondlife\.com|slurl\.com)/secondlife/
        )
        (?P<region>[^/]+)
        (?:/(?P<x>-?\d+)(?:/(?P<y>-?\d+)(?:/(?P<z>-?\d+))?)?)?
        /?\s*$",
    )
    .ok()
});

/// A parsed, navigable location URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slurl {
    region_name: String,
    x: i32,
    y: i32,
    z: i32,
}

impl Slurl {
    /// Creates a SLURL, clamping coordinates into region bounds.
    #[must_use]
    pub fn new(region_name: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            region_name: region_name.into(),
            x: x.clamp(0, MAX_XY),
            y: y.clamp(0, MAX_XY),
            z: z.clamp(0, MAX_Z),
        }
    }

    /// Creates a SLURL pointing at the centre of a region.
    #[must_use]
    pub fn region_centre(region_name: impl Into<String>) -> Self {
        Self::new(region_name, REGION_CENTRE, REGION_CENTRE, 0)
    }

    /// Parses any accepted SLURL spelling.
    ///
    /// Returns `None` for free text, other app urls and empty region names.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let caps = SLURL_PATTERN.as_ref()?.captures(input)?;
        let region = percent_decode(caps.name("region")?.as_str());
        let region = region.trim();
        if region.is_empty() || region.eq_ignore_ascii_case("app") {
            return None;
        }

        let coord = |name: &str, default: i32| {
            caps.name(name)
                .and_then(|m| m.as_str().parse::<i64>().ok())
                .map_or(default, |v| {
                    i32::try_from(v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)))
                        .unwrap_or(default)
                })
        };

        Some(Self::new(
            region,
            coord("x", REGION_CENTRE),
            coord("y", REGION_CENTRE),
            coord("z", 0),
        ))
    }

    /// Region name (decoded).
    #[must_use]
    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    /// Integer region coordinates.
    #[must_use]
    pub const fn coordinates(&self) -> (i32, i32, i32) {
        (self.x, self.y, self.z)
    }
}

impl fmt::Display for Slurl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{CANONICAL_PREFIX}{}/{}/{}/{}",
            percent_encode(&self.region_name),
            self.x,
            self.y,
            self.z
        )
    }
}

impl TryFrom<String> for Slurl {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
            .ok_or_else(|| crate::Error::InvalidInput(format!("not a location url: {value}")))
    }
}

impl From<Slurl> for String {
    fn from(value: Slurl) -> Self {
        value.to_string()
    }
}

fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Decodes a path segment. `+` is literal here, not a space.
fn percent_decode(s: &str) -> String {
    urlencoding::decode(s).map_or_else(
        |_| String::from_utf8_lossy(&urlencoding::decode_binary(s.as_bytes())).into_owned(),
        std::borrow::Cow::into_owned,
    )
}
