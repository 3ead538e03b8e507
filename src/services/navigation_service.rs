//! Session-owned navigation history service.
//!
//! Ties the pieces together for one session: the back/forward stacks, the
//! persistent teleport history, recent places, the address-bar history and
//! the resolver. The agent layer drives it through
//! [`NavigationHistoryService::on_teleport_state_changed`]; UI code drives
//! it through the navigation methods and listens through
//! [`NavigationHistoryService::subscribe`].
//!
//! Back, forward and history picks move the stacks immediately and then
//! teleport. The arrival caused by such a move must not be recorded as a
//! new visit, so these moves set an "ignore next teleport" flag that the
//! next arrival consumes. A failed teleport restores the stacks.

use super::bucketing::{bucket_by_age, start_of_day};
use super::history_store::PersistentHistoryStore;
use super::location_history::{LocationKind, TypedLocationHistory};
use super::navigation::NavigationHistoryStacks;
use super::recent_places::RecentPlacesList;
use super::region_lookup::{HttpRegionLookup, RegionLookup, StaticRegionLookup};
use super::resolver::{LocationResolver, ResolveOutcome, Resolution};
use super::subscriptions::{SubscriptionId, Subscribers};
use super::http::HttpSettings;
use crate::config::{HistoryConfig, WaypointConfig};
use crate::gc::{RetentionPolicy, RetentionResult};
use crate::models::{
    AgeBucket, HistoryEntry, LocationInfo, Navigation, NavigationEvent, Slurl, TeleportState,
};
use crate::storage::{FilesystemBackend, HistoryPersistence};
use crate::current_timestamp;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Starts teleports on behalf of the service.
pub trait Teleporter: Send + Sync {
    /// Requests a teleport to `destination`.
    fn teleport_to(&self, destination: &Slurl);
}

/// Receives addresses that did not resolve to a region.
pub trait SearchFacility: Send + Sync {
    /// Runs a free-text search for `query`.
    fn search(&self, query: &str);
}

/// Clock used for history timestamps.
pub type Clock = fn() -> i64;

/// Builder for [`NavigationHistoryService`].
pub struct NavigationHistoryServiceBuilder {
    config: WaypointConfig,
    teleporter: Option<Arc<dyn Teleporter>>,
    search: Option<Arc<dyn SearchFacility>>,
    lookup: Option<Arc<dyn RegionLookup>>,
    persistence: Option<Arc<dyn HistoryPersistence>>,
    clock: Clock,
}

impl NavigationHistoryServiceBuilder {
    /// Sets the teleport collaborator.
    #[must_use]
    pub fn teleporter(mut self, teleporter: Arc<dyn Teleporter>) -> Self {
        self.teleporter = Some(teleporter);
        self
    }

    /// Sets the search collaborator.
    #[must_use]
    pub fn search(mut self, search: Arc<dyn SearchFacility>) -> Self {
        self.search = Some(search);
        self
    }

    /// Overrides the region lookup built from configuration.
    #[must_use]
    pub fn lookup(mut self, lookup: Arc<dyn RegionLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Overrides the document store (defaults to files under `data_dir`).
    #[must_use]
    pub fn persistence(mut self, persistence: Arc<dyn HistoryPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Overrides the clock.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the service. Nothing is loaded until [`NavigationHistoryService::start`].
    #[must_use]
    pub fn build(self) -> NavigationHistoryService {
        let history = self.config.history;
        let persistence = self
            .persistence
            .unwrap_or_else(|| {
                Arc::new(FilesystemBackend::new(&self.config.data_dir)) as Arc<dyn HistoryPersistence>
            });
        let lookup = self.lookup.unwrap_or_else(|| {
            self.config.lookup.region_lookup_url.as_ref().map_or_else(
                || Arc::new(StaticRegionLookup::new()) as Arc<dyn RegionLookup>,
                |url| {
                    Arc::new(
                        HttpRegionLookup::new(url)
                            .with_settings(HttpSettings::from_config(&self.config.lookup)),
                    ) as Arc<dyn RegionLookup>
                },
            )
        });

        NavigationHistoryService {
            history,
            stacks: NavigationHistoryStacks::new(history.max_navigation_depth),
            store: PersistentHistoryStore::new(
                Arc::clone(&persistence),
                RetentionPolicy::new(history.max_history_age_days),
            ),
            recent: RecentPlacesList::new(history.max_recent_places),
            typed: TypedLocationHistory::new(
                persistence,
                history.max_typed_locations,
                history.address_bar_max_history_age,
            ),
            resolver: LocationResolver::new(lookup),
            teleporter: self.teleporter,
            search: self.search,
            subscribers: Subscribers::new(),
            clock: self.clock,
            ignore_next_teleport: false,
            in_flight: None,
            pending_destination: None,
            pending_address: None,
        }
    }
}

/// Navigation history for one session.
pub struct NavigationHistoryService {
    history: HistoryConfig,
    stacks: NavigationHistoryStacks,
    store: PersistentHistoryStore,
    recent: RecentPlacesList,
    typed: TypedLocationHistory,
    resolver: LocationResolver,
    teleporter: Option<Arc<dyn Teleporter>>,
    search: Option<Arc<dyn SearchFacility>>,
    subscribers: Subscribers<NavigationEvent>,
    clock: Clock,
    ignore_next_teleport: bool,
    /// Stacks as they were before a back/forward/pick, until it lands.
    in_flight: Option<NavigationHistoryStacks>,
    pending_destination: Option<Slurl>,
    pending_address: Option<String>,
}

impl NavigationHistoryService {
    /// Starts building a service.
    #[must_use]
    pub fn builder(config: WaypointConfig) -> NavigationHistoryServiceBuilder {
        NavigationHistoryServiceBuilder {
            config,
            teleporter: None,
            search: None,
            lookup: None,
            persistence: None,
            clock: current_timestamp,
        }
    }

    /// Loads persisted history and rebuilds the derived lists.
    #[instrument(name = "waypoint.service.start", skip(self))]
    pub fn start(&mut self) {
        let now = (self.clock)();
        self.store.load_at(now);
        self.recent.rebuild(self.store.entries());
        self.typed.load_at(now);
        info!(
            history = self.store.len(),
            recent = self.recent.len(),
            typed = self.typed.len(),
            "Navigation history ready"
        );
        self.subscribers.notify(&NavigationEvent::HistoryChanged);
    }

    /// Handles an address committed in the address bar.
    ///
    /// SLURLs teleport at once. Names are looked up in the background; call
    /// [`poll_resolutions`](Self::poll_resolutions) to act on the result.
    #[instrument(name = "waypoint.service.commit_address", skip(self))]
    pub fn commit_address(&mut self, address: &str) -> ResolveOutcome {
        let outcome = self.resolver.resolve(address);
        match &outcome {
            ResolveOutcome::Direct(url) => {
                self.pending_address = None;
                self.record_typed(address, LocationKind::Typed);
                self.request_teleport(url);
            },
            ResolveOutcome::Pending(token) => {
                debug!(token = %token, "Waiting for region lookup");
                self.pending_address = Some(address.trim().to_string());
            },
            ResolveOutcome::Ignored => {
                self.pending_address = None;
            },
        }
        outcome
    }

    /// Acts on finished lookups. Returns how many were handled.
    pub fn poll_resolutions(&mut self) -> usize {
        let resolutions = self.resolver.poll();
        let handled = resolutions.len();
        for resolution in resolutions {
            self.handle_resolution(resolution);
        }
        handled
    }

    /// Waits for the pending lookup, if any, and acts on it.
    pub async fn wait_for_resolution(&mut self) -> Option<Resolution> {
        let resolution = self.resolver.next_resolution().await?;
        self.handle_resolution(resolution.clone());
        Some(resolution)
    }

    fn handle_resolution(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Resolved { url, .. } => {
                if let Some(address) = self.pending_address.take() {
                    self.record_typed(&address, LocationKind::Typed);
                }
                self.request_teleport(&url);
            },
            Resolution::Unresolved { query, .. } => {
                self.pending_address = None;
                if let Some(search) = &self.search {
                    search.search(&query);
                } else {
                    debug!(query = %query, "No search facility configured");
                }
                metrics::counter!("navigation_search_fallback_total").increment(1);
                self.subscribers
                    .notify(&NavigationEvent::SearchRequested { query });
            },
        }
    }

    /// Back button. Returns `false` if there is nothing to go back to.
    pub fn go_back(&mut self) -> bool {
        self.move_within_history(Navigation::Back)
    }

    /// Forward button. Returns `false` if there is nothing to go forward to.
    pub fn go_forward(&mut self) -> bool {
        self.move_within_history(Navigation::Forward)
    }

    /// Jumps to a location picked from the history dropdown.
    ///
    /// A location that is not in the current chain is treated as a new
    /// destination and recorded on arrival.
    pub fn pick_history(&mut self, location: LocationInfo) -> bool {
        if self.stacks.ordered().contains(&location) {
            return self.move_within_history(Navigation::HistoryPick(location));
        }
        self.request_teleport(&location.slurl());
        true
    }

    fn move_within_history(&mut self, navigation: Navigation) -> bool {
        let via = navigation.kind();
        let before = self.stacks.clone();
        if !self.stacks.navigate(navigation) {
            return false;
        }
        let Some(target) = self.stacks.current().cloned() else {
            return false;
        };

        // Keep the oldest snapshot while moves chain before an arrival.
        self.in_flight.get_or_insert(before);
        self.ignore_next_teleport = true;
        self.subscribers.notify(&NavigationEvent::LocationChanged {
            location: target.clone(),
            via,
        });
        self.request_teleport(&target.slurl());
        true
    }

    fn request_teleport(&self, url: &Slurl) {
        if let Some(teleporter) = &self.teleporter {
            teleporter.teleport_to(url);
        } else {
            debug!(destination = %url, "No teleporter configured");
        }
        self.subscribers
            .notify(&NavigationEvent::TeleportRequested { url: url.clone() });
    }

    /// Teleport state transition reported by the agent layer.
    #[instrument(name = "waypoint.service.teleport_state", skip(self))]
    pub fn on_teleport_state_changed(&mut self, state: TeleportState, destination: Option<&str>) {
        let destination = destination.and_then(Slurl::parse);
        match state {
            TeleportState::None | TeleportState::Requested => {},
            TeleportState::Moving => {
                if destination.is_some() {
                    self.pending_destination = destination;
                }
            },
            TeleportState::Arriving => {
                let destination = destination.or_else(|| self.pending_destination.take());
                self.pending_destination = None;

                if self.ignore_next_teleport {
                    self.ignore_next_teleport = false;
                    self.in_flight = None;
                    debug!("Arrival from history navigation, not recorded");
                    self.subscribers.notify(&NavigationEvent::HistoryChanged);
                    return;
                }

                match destination {
                    Some(url) => self.record_arrival(LocationInfo::from_slurl(&url)),
                    None => debug!("Arrival without a destination, not recorded"),
                }
            },
            TeleportState::Failed => {
                self.pending_destination = None;
                self.ignore_next_teleport = false;
                if let Some(before) = self.in_flight.take() {
                    self.stacks = before;
                    info!("Teleport failed, restored navigation history");
                    if let Some(location) = self.stacks.current().cloned() {
                        self.subscribers.notify(&NavigationEvent::LocationChanged {
                            location,
                            via: "revert",
                        });
                    }
                }
            },
        }
    }

    fn record_arrival(&mut self, location: LocationInfo) {
        let now = (self.clock)();
        let moved = self.stacks.navigate(Navigation::Direct(location.clone()));

        let entry = HistoryEntry::for_location(&location, now);
        self.store.append(entry.clone());
        let trimmed = self.store.trim_at(self.history.max_history_age_days, now);
        self.store.save();
        if trimmed.has_removed() {
            self.recent.rebuild(self.store.entries());
        } else {
            self.recent.add(entry);
        }
        self.record_typed(&location.title(), LocationKind::Teleport);

        if moved {
            self.subscribers
                .notify(&NavigationEvent::LocationChanged {
                    location,
                    via: "direct",
                });
        }
        self.subscribers.notify(&NavigationEvent::HistoryChanged);
    }

    fn record_typed(&mut self, title: &str, kind: LocationKind) {
        if self.typed.add(title, kind, (self.clock)()) {
            self.typed.save();
        }
    }

    /// Drops teleport history older than `max_age_days` and saves.
    pub fn trim_history(&mut self, max_age_days: u32) -> RetentionResult {
        let result = self.store.trim_at(max_age_days, (self.clock)());
        self.store.save();
        self.recent.rebuild(self.store.entries());
        if result.has_removed() {
            self.subscribers.notify(&NavigationEvent::HistoryChanged);
        }
        result
    }

    /// Clears all history lists and saves the empty documents.
    ///
    /// The current location stays; only the lists around it are emptied.
    pub fn clear_history(&mut self) {
        self.store.clear();
        self.recent.clear();
        self.typed.clear();
        self.stacks.clear();
        self.in_flight = None;
        info!("Navigation history cleared");
        self.subscribers.notify(&NavigationEvent::HistoryCleared);
    }

    /// Registers an event callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&NavigationEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Removes an event callback.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Teleport history grouped for display, newest first in each group.
    ///
    /// Groups follow calendar days in local time.
    #[must_use]
    pub fn history_buckets(&self, now: i64) -> BTreeMap<AgeBucket, Vec<LocationInfo>> {
        let newest_first: Vec<HistoryEntry> = self.store.entries().iter().rev().cloned().collect();
        bucket_by_age(&newest_first, start_of_day(now))
    }

    /// Back/forward stacks.
    #[must_use]
    pub const fn stacks(&self) -> &NavigationHistoryStacks {
        &self.stacks
    }

    /// Recent places.
    #[must_use]
    pub const fn recent_places(&self) -> &RecentPlacesList {
        &self.recent
    }

    /// Address-bar history.
    #[must_use]
    pub const fn typed_history(&self) -> &TypedLocationHistory {
        &self.typed
    }

    /// Persistent teleport history.
    #[must_use]
    pub const fn store(&self) -> &PersistentHistoryStore {
        &self.store
    }

    /// Address resolver.
    #[must_use]
    pub const fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    /// Whether the next arrival will be skipped.
    #[must_use]
    pub const fn is_ignoring_next_teleport(&self) -> bool {
        self.ignore_next_teleport
    }

    /// History limits in effect.
    #[must_use]
    pub const fn history_config(&self) -> HistoryConfig {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionPosition;
    use crate::services::region_lookup::RegionHandle;
    use crate::storage::MemoryBackend;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    const NOW: i64 = 1_700_000_000;

    fn fixed_clock() -> i64 {
        NOW
    }

    #[derive(Default)]
    struct RecordingAgent {
        teleports: Mutex<Vec<Slurl>>,
        searches: Mutex<Vec<String>>,
    }

    impl Teleporter for RecordingAgent {
        fn teleport_to(&self, destination: &Slurl) {
            self.teleports.lock().unwrap().push(destination.clone());
        }
    }

    impl SearchFacility for RecordingAgent {
        fn search(&self, query: &str) {
            self.searches.lock().unwrap().push(query.to_string());
        }
    }

    fn service(agent: &Arc<RecordingAgent>, backend: &Arc<MemoryBackend>) -> NavigationHistoryService {
        let mut service = NavigationHistoryService::builder(WaypointConfig::new())
            .teleporter(agent.clone())
            .search(agent.clone())
            .lookup(Arc::new(
                StaticRegionLookup::new().with_region("Ahern", RegionHandle::from_grid(997, 1002)),
            ))
            .persistence(backend.clone())
            .clock(fixed_clock)
            .build();
        service.start();
        service
    }

    fn arrive(service: &mut NavigationHistoryService, region: &str) {
        let url = format!("secondlife://{region}/128/128/20");
        service.on_teleport_state_changed(TeleportState::Moving, Some(&url));
        service.on_teleport_state_changed(TeleportState::Arriving, None);
    }

    fn current_region(service: &NavigationHistoryService) -> Option<String> {
        service
            .stacks()
            .current()
            .map(|l| l.region_name().to_string())
    }

    #[test]
    fn test_arrival_records_everywhere() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        let mut service = service(&agent, &backend);

        arrive(&mut service, "Ahern");
        arrive(&mut service, "Morris");

        assert_eq!(current_region(&service).as_deref(), Some("Morris"));
        assert!(service.stacks().can_go_back());
        assert_eq!(service.store().len(), 2);
        assert_eq!(service.recent_places().len(), 2);
        assert_eq!(service.typed_history().len(), 2);
    }

    #[test]
    fn test_back_arrival_is_not_recorded() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        let mut service = service(&agent, &backend);
        arrive(&mut service, "Ahern");
        arrive(&mut service, "Morris");

        assert!(service.go_back());
        assert!(service.is_ignoring_next_teleport());
        assert_eq!(current_region(&service).as_deref(), Some("Ahern"));
        assert_eq!(
            agent.teleports.lock().unwrap().last().map(Slurl::region_name),
            Some("Ahern")
        );

        arrive(&mut service, "Ahern");
        assert!(!service.is_ignoring_next_teleport());
        assert_eq!(service.store().len(), 2);
        assert!(service.stacks().can_go_forward());
    }

    #[test]
    fn test_failed_teleport_reverts_back() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        let mut service = service(&agent, &backend);
        arrive(&mut service, "Ahern");
        arrive(&mut service, "Morris");

        service.go_back();
        service.on_teleport_state_changed(TeleportState::Failed, None);

        assert_eq!(current_region(&service).as_deref(), Some("Morris"));
        assert!(!service.stacks().can_go_forward());
        assert!(!service.is_ignoring_next_teleport());
    }

    #[test]
    fn test_failed_teleport_after_chained_backs_restores_first_state() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        let mut service = service(&agent, &backend);
        for region in ["A", "B", "C"] {
            arrive(&mut service, region);
        }

        assert!(service.go_back());
        assert!(service.go_back());
        assert_eq!(current_region(&service).as_deref(), Some("A"));
        service.on_teleport_state_changed(TeleportState::Failed, None);

        assert_eq!(current_region(&service).as_deref(), Some("C"));
        assert!(!service.stacks().can_go_forward());
        assert_eq!(service.stacks().back().len(), 2);
    }

    #[test]
    fn test_commit_slurl_teleports_directly() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        let mut service = service(&agent, &backend);

        let outcome = service.commit_address("secondlife://Ahern/10/20/30");
        assert!(matches!(outcome, ResolveOutcome::Direct(_)));
        assert_eq!(
            *agent.teleports.lock().unwrap(),
            vec![Slurl::new("Ahern", 10, 20, 30)]
        );
        assert_eq!(service.typed_history().len(), 1);
    }

    #[test]
    fn test_unresolved_name_goes_to_search() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        let mut service = service(&agent, &backend);

        assert!(matches!(
            service.commit_address("cheap land"),
            ResolveOutcome::Pending(_)
        ));

        let deadline = Instant::now() + Duration::from_secs(5);
        while service.poll_resolutions() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(*agent.searches.lock().unwrap(), vec!["cheap land".to_string()]);
        assert!(agent.teleports.lock().unwrap().is_empty());
        assert!(service.typed_history().is_empty());
    }

    #[tokio::test]
    async fn test_named_region_resolves_and_teleports() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        let mut service = service(&agent, &backend);

        service.commit_address("Ahern (10, 20, 30)");
        let resolution = service.wait_for_resolution().await;
        assert!(matches!(resolution, Some(Resolution::Resolved { .. })));
        assert_eq!(
            *agent.teleports.lock().unwrap(),
            vec![Slurl::new("Ahern", 10, 20, 30)]
        );
        assert_eq!(service.typed_history().entries()[0].title, "Ahern (10, 20, 30)");
    }

    #[test]
    fn test_pick_unknown_location_teleports_and_records_on_arrival() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        let mut service = service(&agent, &backend);
        arrive(&mut service, "Ahern");

        let elsewhere = LocationInfo::new("Morris", RegionPosition::new(128.0, 128.0, 20.0));
        assert!(service.pick_history(elsewhere));
        assert!(!service.is_ignoring_next_teleport());

        arrive(&mut service, "Morris");
        assert_eq!(service.store().len(), 2);
    }

    #[test]
    fn test_subscribers_see_events() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        let mut service = service(&agent, &backend);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = service.subscribe(move |event| sink.lock().unwrap().push(event.event_type()));

        arrive(&mut service, "Ahern");
        service.clear_history();
        assert!(service.unsubscribe(id));
        arrive(&mut service, "Morris");

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["location_changed", "history_changed", "history_cleared"]
        );
    }

    #[test]
    fn test_history_survives_restart() {
        let agent = Arc::new(RecordingAgent::default());
        let backend = Arc::new(MemoryBackend::new());
        {
            let mut first = service(&agent, &backend);
            arrive(&mut first, "Ahern");
            arrive(&mut first, "Morris");
        }

        let second = service(&agent, &backend);
        assert_eq!(second.store().len(), 2);
        assert_eq!(second.recent_places().len(), 2);
        let today = second
            .history_buckets(NOW)
            .remove(&AgeBucket::Today)
            .unwrap_or_default();
        let names: Vec<_> = today.iter().map(LocationInfo::region_name).collect();
        assert_eq!(names, vec!["Morris", "Ahern"]);
    }
}
