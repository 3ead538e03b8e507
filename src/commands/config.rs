//! Config command handler.
//!
//! Contains the implementation of the `config` CLI command.

use waypoint::config::WaypointConfig;

/// Config command.
pub fn cmd_config(config: &WaypointConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !show {
        println!("Use --show to display current configuration");
        return Ok(());
    }

    println!("Current Configuration");
    println!("=====================");
    println!();

    println!("Config File:");
    match &config.source {
        Some(path) => println!("  {}", path.display()),
        None => println!("  (none - using defaults)"),
    }
    println!();

    println!("Data Directory: {}", config.data_dir.display());
    println!();

    let history = &config.history;
    println!("History:");
    println!("  Max History Age: {} days", history.max_history_age_days);
    println!("  Max Recent Places: {}", history.max_recent_places);
    println!(
        "  Address Bar Max Age: {} days",
        history.address_bar_max_history_age
    );
    println!("  Max Navigation Depth: {}", history.max_navigation_depth);
    println!("  Max Typed Locations: {}", history.max_typed_locations);
    println!();

    let lookup = &config.lookup;
    println!("Lookup:");
    println!(
        "  Region Lookup URL: {}",
        lookup.region_lookup_url.as_deref().unwrap_or("(offline)")
    );
    println!(
        "  Parcel Info URL: {}",
        lookup.parcel_info_url.as_deref().unwrap_or("(none)")
    );
    println!("  Timeout: {}ms", lookup.timeout_ms);
    println!("  Connect Timeout: {}ms", lookup.connect_timeout_ms);
    println!();

    let logging = &config.logging;
    println!("Logging:");
    println!(
        "  Format: {}",
        logging.format.as_deref().unwrap_or("pretty")
    );
    println!("  Level: {}", logging.level.as_deref().unwrap_or("warn"));
    match &logging.file {
        Some(path) => println!("  File: {}", path.display()),
        None => println!("  File: (stderr)"),
    }

    Ok(())
}
