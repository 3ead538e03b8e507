//! Navigation history services.
//!
//! Each service owns one piece of navigation state; the
//! [`NavigationHistoryService`] ties them together for a session.

mod background;
mod bucketing;
pub mod history_store;
pub mod http;
pub mod location_history;
pub mod navigation;
mod navigation_service;
pub mod parcel_info;
pub mod recent_places;
pub mod region_lookup;
mod resolver;
mod subscriptions;

pub use bucketing::{bucket_by_age, start_of_day};
pub use history_store::{PersistentHistoryStore, TELEPORT_HISTORY_DOCUMENT};
pub use http::{HttpSettings, build_http_client};
pub use location_history::{LocationKind, TYPED_LOCATIONS_DOCUMENT, TypedLocation, TypedLocationHistory};
pub use navigation::NavigationHistoryStacks;
pub use navigation_service::{
    Clock, NavigationHistoryService, NavigationHistoryServiceBuilder, SearchFacility, Teleporter,
};
pub use parcel_info::{
    HttpParcelInfoClient, ParcelData, ParcelEvent, ParcelId, ParcelIdRequest, ParcelInfoClient,
    ParcelInfoProcessor, ParcelRequestToken,
};
pub use recent_places::RecentPlacesList;
pub use region_lookup::{
    HttpRegionLookup, RegionHandle, RegionLookup, RegionMatch, StaticRegionLookup,
};
pub use resolver::{LocationResolver, RegionQuery, RequestToken, ResolveOutcome, Resolution};
pub use subscriptions::{SubscriptionId, Subscribers};
