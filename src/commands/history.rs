//! History command handlers.

use super::start_service;
use waypoint::config::WaypointConfig;
use waypoint::current_timestamp;

/// History command.
///
/// Lists teleport history newest first, optionally grouped by day.
pub fn cmd_history(config: WaypointConfig, buckets: bool) -> Result<(), Box<dyn std::error::Error>> {
    let service = start_service(config);
    let entries = service.store().entries();

    if entries.is_empty() {
        println!("No teleport history.");
        return Ok(());
    }

    if buckets {
        for (bucket, locations) in service.history_buckets(current_timestamp()) {
            println!("{bucket}");
            for location in locations {
                println!("  {location}");
            }
        }
        return Ok(());
    }

    for entry in entries.iter().rev() {
        println!("{}  {}  {}", format_timestamp(entry.timestamp), entry.name, entry.url);
    }
    Ok(())
}

/// Recent places command.
pub fn cmd_recent(config: WaypointConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = start_service(config);
    let recent = service.recent_places();

    if !recent.is_enabled() {
        println!("Recent places are disabled (max_recent_places = 0).");
        return Ok(());
    }
    if recent.is_empty() {
        println!("No recent places.");
        return Ok(());
    }

    for (index, location) in recent.locations().iter().enumerate() {
        println!("{:>3}. {location}", index + 1);
    }
    Ok(())
}

/// Typed history command.
pub fn cmd_typed(
    config: WaypointConfig,
    filter: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = start_service(config);
    let matches = service.typed_history().matching(filter.unwrap_or_default());

    if matches.is_empty() {
        println!("No address bar history.");
        return Ok(());
    }

    for entry in matches {
        println!(
            "{}  {:<8}  {}",
            format_timestamp(entry.timestamp),
            entry.kind,
            entry.title
        );
    }
    Ok(())
}

/// Trim command.
///
/// Drops entries older than `days`, or the configured retention.
pub fn cmd_trim(config: WaypointConfig, days: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let days = days.unwrap_or(config.history.max_history_age_days);
    let mut service = start_service(config);

    let result = service.trim_history(days);
    println!("{}", result.summary());
    Ok(())
}

/// Clear command.
pub fn cmd_clear(config: WaypointConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = start_service(config);
    let removed = service.store().len();
    service.clear_history();
    println!("Cleared {removed} history entries.");
    Ok(())
}

fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0).map_or_else(
        || timestamp.to_string(),
        |utc| {
            utc.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}
