//! Command handlers module.
//!
//! This module organizes the CLI command implementations into separate files:
//! - `history.rs`: History listing and maintenance (history, recent, typed, trim, clear)
//! - `navigate.rs`: Address commands (visit, resolve)
//! - `parcel.rs`: Remote parcel details
//! - `config.rs`: Configuration display command

mod config;
mod history;
mod navigate;
mod parcel;

use std::sync::Arc;

use waypoint::config::WaypointConfig;
use waypoint::{NavigationHistoryService, SearchFacility, Slurl, Teleporter};

// Re-export command functions
pub use config::cmd_config;
pub use history::{cmd_clear, cmd_history, cmd_recent, cmd_trim, cmd_typed};
pub use navigate::{cmd_resolve, cmd_visit};
pub use parcel::cmd_parcel;

/// Agent stand-in for the command line: teleports and searches are printed.
struct ConsoleAgent;

impl Teleporter for ConsoleAgent {
    fn teleport_to(&self, destination: &Slurl) {
        println!("Teleporting to {destination}");
    }
}

impl SearchFacility for ConsoleAgent {
    fn search(&self, query: &str) {
        println!("No region named \"{query}\"; search for it instead");
    }
}

/// Builds and starts a service over the configured data directory.
fn start_service(config: WaypointConfig) -> NavigationHistoryService {
    let agent = Arc::new(ConsoleAgent);
    let mut service = NavigationHistoryService::builder(config)
        .teleporter(Arc::clone(&agent) as Arc<dyn Teleporter>)
        .search(agent as Arc<dyn SearchFacility>)
        .build();
    service.start();
    service
}
