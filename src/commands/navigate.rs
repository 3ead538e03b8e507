//! Address command handlers.
//!
//! The command line has no agent, so `visit` reports the teleport as
//! landed as soon as it is requested.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::start_service;
use waypoint::config::WaypointConfig;
use waypoint::{
    MemoryBackend, NavigationEvent, NavigationHistoryService, ResolveOutcome, Resolution, Slurl,
    TeleportState,
};

/// Visit command.
///
/// Commits `address` as if typed in the address bar, waits for the region
/// lookup if one was needed, and records the arrival.
pub async fn cmd_visit(
    config: WaypointConfig,
    address: &str,
    timeout_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = start_service(config);

    let requested: Arc<Mutex<Option<Slurl>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&requested);
    let subscription = service.subscribe(move |event| {
        if let NavigationEvent::TeleportRequested { url } = event {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(url.clone());
            }
        }
    });

    match service.commit_address(address) {
        ResolveOutcome::Ignored => {
            println!("Nothing to visit.");
            return Ok(());
        },
        ResolveOutcome::Pending(token) => {
            tracing::debug!(token = %token, "Waiting for region lookup");
            wait_for(&mut service, timeout_secs).await?;
        },
        ResolveOutcome::Direct(_) => {},
    }
    service.unsubscribe(subscription);

    let destination = requested
        .lock()
        .map_err(|e| e.to_string())?
        .take();
    let Some(destination) = destination else {
        return Ok(());
    };

    let url = destination.to_string();
    service.on_teleport_state_changed(TeleportState::Moving, Some(&url));
    service.on_teleport_state_changed(TeleportState::Arriving, Some(&url));
    println!("Arrived at {}", destination.region_name());
    Ok(())
}

/// Resolve command.
///
/// Prints where `address` leads without touching any history.
pub async fn cmd_resolve(
    config: WaypointConfig,
    address: &str,
    timeout_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = NavigationHistoryService::builder(config)
        .persistence(Arc::new(MemoryBackend::new()))
        .build();

    match service.commit_address(address) {
        ResolveOutcome::Ignored => println!("Nothing to resolve."),
        ResolveOutcome::Direct(url) => println!("{url}"),
        ResolveOutcome::Pending(_) => match wait_for(&mut service, timeout_secs).await? {
            Resolution::Resolved { handle, url, .. } => println!("{url}  (region {handle})"),
            Resolution::Unresolved { query, .. } => println!("No region named \"{query}\""),
        },
    }
    Ok(())
}

async fn wait_for(
    service: &mut NavigationHistoryService,
    timeout_secs: u64,
) -> Result<Resolution, Box<dyn std::error::Error>> {
    let waited =
        tokio::time::timeout(Duration::from_secs(timeout_secs), service.wait_for_resolution())
            .await
            .map_err(|_| format!("region lookup timed out after {timeout_secs}s"))?;
    waited.ok_or_else(|| "region lookup ended without a result".into())
}
