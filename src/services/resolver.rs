//! Address resolution for the navigation bar.
//!
//! An address either parses as a SLURL and resolves immediately, or it is
//! treated as a region name and looked up in the background. Each lookup
//! carries a [`RequestToken`]. Only the most recently issued token is live:
//! a newer [`LocationResolver::resolve`] call supersedes the previous one,
//! and a completion that arrives for a superseded token is dropped instead
//! of overwriting the newer result.
//!
//! Completions are delivered on the owner's side through
//! [`LocationResolver::poll`] or [`LocationResolver::next_resolution`].

use super::background::spawn_background;
use super::region_lookup::{RegionHandle, RegionLookup};
use crate::models::Slurl;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, instrument, warn};

static TITLE_FORM: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // "Region Name (x, y, z)", the title history lists display.
    Regex::new(
        r"^\s*(?P<name>.+?)\s*\(\s*(?P<x>-?\d+(?:\.\d+)?)\s*,\s*(?P<y>-?\d+(?:\.\d+)?)\s*,\s*(?P<z>-?\d+(?:\.\d+)?)\s*\)\s*$",
    )
    .ok()
});

static PATH_FORM: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // "Region Name/x/y/z", trailing coordinates optional.
    Regex::new(r"^\s*(?P<name>[^/]+?)\s*/(?P<x>\d+)(?:/(?P<y>\d+)(?:/(?P<z>\d+))?)?/?\s*$").ok()
});

/// Identifies one [`LocationResolver::resolve`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Raw token value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immediate answer to [`LocationResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The address was a SLURL; navigate now.
    Direct(Slurl),
    /// A region lookup is in flight; its completion carries this token.
    Pending(RequestToken),
    /// Empty input.
    Ignored,
}

/// Completion of a pending lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The region exists.
    Resolved {
        /// Originating request.
        token: RequestToken,
        /// Grid handle of the region.
        handle: RegionHandle,
        /// Canonical destination.
        url: Slurl,
    },
    /// No region matched; the query should go to search instead.
    Unresolved {
        /// Originating request.
        token: RequestToken,
        /// The address as typed.
        query: String,
    },
}

impl Resolution {
    /// Originating request.
    #[must_use]
    pub const fn token(&self) -> RequestToken {
        match self {
            Self::Resolved { token, .. } | Self::Unresolved { token, .. } => *token,
        }
    }

    const fn outcome(&self) -> &'static str {
        match self {
            Self::Resolved { .. } => "resolved",
            Self::Unresolved { .. } => "unresolved",
        }
    }
}

/// A free-text address split into a region name and optional coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionQuery {
    /// Region to look up.
    pub region_name: String,
    /// Coordinates given with the name.
    pub coordinates: Option<(i32, i32, i32)>,
}

impl RegionQuery {
    /// Splits `address` into region name and coordinates.
    ///
    /// Accepts `Region (x, y, z)` and `Region/x/y/z`; anything else is taken
    /// as a bare region name.
    #[must_use]
    pub fn parse(address: &str) -> Self {
        let address = address.trim();

        if let Some(caps) = TITLE_FORM.as_ref().and_then(|re| re.captures(address)) {
            let coord = |name: &str| {
                caps.name(name)
                    .and_then(|m| m.as_str().parse::<f32>().ok())
                    .map_or(0, round_coordinate)
            };
            return Self {
                region_name: caps["name"].to_string(),
                coordinates: Some((coord("x"), coord("y"), coord("z"))),
            };
        }

        if let Some(caps) = PATH_FORM.as_ref().and_then(|re| re.captures(address)) {
            let coord = |name: &str, default: i32| {
                caps.name(name)
                    .and_then(|m| m.as_str().parse::<i32>().ok())
                    .unwrap_or(default)
            };
            return Self {
                region_name: caps["name"].to_string(),
                coordinates: Some((
                    coord("x", crate::models::slurl::REGION_CENTRE),
                    coord("y", crate::models::slurl::REGION_CENTRE),
                    coord("z", 0),
                )),
            };
        }

        Self {
            region_name: address.to_string(),
            coordinates: None,
        }
    }

    fn destination(&self, region_name: &str) -> Slurl {
        self.coordinates.map_or_else(
            || Slurl::region_centre(region_name),
            |(x, y, z)| Slurl::new(region_name, x, y, z),
        )
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn round_coordinate(value: f32) -> i32 {
    value.round().clamp(i32::MIN as f32, i32::MAX as f32) as i32
}

/// Resolves typed addresses, one live request at a time.
pub struct LocationResolver {
    lookup: Arc<dyn RegionLookup>,
    next_token: u64,
    pending: Option<RequestToken>,
    sender: UnboundedSender<Resolution>,
    receiver: UnboundedReceiver<Resolution>,
    stale_discarded: u64,
}

impl fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationResolver")
            .field("next_token", &self.next_token)
            .field("pending", &self.pending)
            .field("stale_discarded", &self.stale_discarded)
            .finish_non_exhaustive()
    }
}

impl LocationResolver {
    /// Creates a resolver backed by `lookup`.
    #[must_use]
    pub fn new(lookup: Arc<dyn RegionLookup>) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            lookup,
            next_token: 0,
            pending: None,
            sender,
            receiver,
            stale_discarded: 0,
        }
    }

    /// Resolves `address`.
    ///
    /// Supersedes any request still pending, whatever the outcome of this
    /// one.
    #[instrument(name = "waypoint.resolver.resolve", skip(self))]
    pub fn resolve(&mut self, address: &str) -> ResolveOutcome {
        if let Some(previous) = self.pending.take() {
            debug!(superseded = %previous, "Superseding pending resolution");
        }

        let address = address.trim();
        if address.is_empty() {
            return ResolveOutcome::Ignored;
        }

        if let Some(slurl) = Slurl::parse(address) {
            metrics::counter!("resolver_requests_total", "outcome" => "direct").increment(1);
            return ResolveOutcome::Direct(slurl);
        }

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        self.pending = Some(token);
        metrics::counter!("resolver_requests_total", "outcome" => "pending").increment(1);

        self.spawn_lookup(token, address.to_string());
        ResolveOutcome::Pending(token)
    }

    fn spawn_lookup(&self, token: RequestToken, address: String) {
        let lookup = Arc::clone(&self.lookup);
        let sender = self.sender.clone();
        let query = address.clone();

        let started = spawn_background("waypoint-region-lookup", move || {
            let resolution = run_lookup(lookup.as_ref(), token, address);
            // The resolver may be gone already; nothing is waiting then.
            let _ = sender.send(resolution);
        });

        if !started {
            let _ = self.sender.send(Resolution::Unresolved { token, query });
        }
    }

    /// Drains completions without blocking.
    ///
    /// Returns at most the one resolution for the live request; stale
    /// completions are discarded.
    pub fn poll(&mut self) -> Vec<Resolution> {
        let mut delivered = Vec::new();
        while let Ok(resolution) = self.receiver.try_recv() {
            if let Some(accepted) = self.accept(resolution) {
                delivered.push(accepted);
            }
        }
        delivered
    }

    /// Waits for the live request to complete.
    ///
    /// Returns `None` immediately when nothing is pending.
    pub async fn next_resolution(&mut self) -> Option<Resolution> {
        while self.pending.is_some() {
            let resolution = self.receiver.recv().await?;
            if let Some(accepted) = self.accept(resolution) {
                return Some(accepted);
            }
        }
        None
    }

    fn accept(&mut self, resolution: Resolution) -> Option<Resolution> {
        let token = resolution.token();
        if self.pending == Some(token) {
            self.pending = None;
            metrics::counter!("resolver_completions_total", "outcome" => resolution.outcome())
                .increment(1);
            return Some(resolution);
        }

        self.stale_discarded += 1;
        metrics::counter!("resolver_stale_completions_total").increment(1);
        debug!(token = %token, live = ?self.pending, "Discarded stale resolution");
        None
    }

    /// Token of the request still in flight, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<RequestToken> {
        self.pending
    }

    /// Returns `true` while a lookup is outstanding.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Completions dropped because a newer request superseded them.
    #[must_use]
    pub const fn stale_discarded(&self) -> u64 {
        self.stale_discarded
    }
}

fn run_lookup(lookup: &dyn RegionLookup, token: RequestToken, address: String) -> Resolution {
    let query = RegionQuery::parse(&address);
    match lookup.lookup_region(&query.region_name) {
        Ok(Some(region)) => Resolution::Resolved {
            token,
            handle: region.handle,
            url: query.destination(&region.name),
        },
        Ok(None) => Resolution::Unresolved {
            token,
            query: address,
        },
        Err(e) => {
            warn!(error = %e, region = %query.region_name, "Region lookup failed, falling back to search");
            Resolution::Unresolved {
                token,
                query: address,
            }
        },
    }
}
