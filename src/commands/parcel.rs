//! Parcel command handler.

use std::sync::Arc;
use std::time::Duration;

use waypoint::config::WaypointConfig;
use waypoint::services::{
    HttpParcelInfoClient, HttpSettings, ParcelData, ParcelEvent, ParcelId, ParcelInfoClient,
    ParcelInfoProcessor,
};

/// Parcel command.
///
/// Fetches details of one parcel from the configured parcel info service.
pub async fn cmd_parcel(
    config: &WaypointConfig,
    id: &str,
    timeout_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(endpoint) = config.lookup.parcel_info_url.as_deref() else {
        return Err("no parcel info service configured (lookup.parcel_info_url)".into());
    };
    let parcel_id = ParcelId::new(uuid::Uuid::parse_str(id.trim())?);

    let client = HttpParcelInfoClient::new(endpoint)
        .with_settings(HttpSettings::from_config(&config.lookup));
    let mut processor = ParcelInfoProcessor::new(Arc::new(client) as Arc<dyn ParcelInfoClient>);
    let observer = processor.add_observer(parcel_id, display_parcel);
    processor.request_details(parcel_id);

    let event = tokio::time::timeout(Duration::from_secs(timeout_secs), processor.next_event())
        .await
        .map_err(|_| format!("parcel request timed out after {timeout_secs}s"))?;
    processor.remove_observer(parcel_id, observer);

    match event {
        Some(ParcelEvent::Failed { reason, .. }) => Err(reason.into()),
        Some(_) => Ok(()),
        None => Err("parcel request ended without a result".into()),
    }
}

fn display_parcel(parcel: &ParcelData) {
    println!("Parcel Details");
    println!("==============");
    println!("Id: {}", parcel.parcel_id);
    println!("Name: {}", parcel.name);
    if !parcel.description.is_empty() {
        println!("Description: {}", parcel.description);
    }
    println!("Region: {}", parcel.sim_name);
    println!("Area: {} m²", parcel.actual_area);
    let [x, y, z] = parcel.global_position;
    println!("Global Position: {x:.0}, {y:.0}, {z:.0}");
    if let Some(owner) = parcel.owner_id {
        println!("Owner: {owner}");
    }
}
