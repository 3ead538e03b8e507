//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when nothing is configured.
const DEFAULT_LEVEL: &str = "warn";

/// Filter used with `--verbose`.
const VERBOSE_LEVEL: &str = "waypoint=debug,info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; unknown names fall back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Log file; stderr when `None`.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Resolves settings against `RUST_LOG` and the verbose flag.
    ///
    /// Precedence for the filter: `RUST_LOG`, then `--verbose`, then the
    /// configured level, then `warn`.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let format = settings
            .and_then(|s| s.format.as_deref())
            .map_or_else(LogFormat::default, LogFormat::parse);

        let fallback = if verbose {
            VERBOSE_LEVEL.to_string()
        } else {
            settings
                .and_then(|s| s.level.clone())
                .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
        };
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&fallback))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

        Self {
            format,
            filter,
            file: settings.and_then(|s| s.file.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("json", LogFormat::Json; "json")]
    #[test_case(" JSON ", LogFormat::Json; "case and spaces")]
    #[test_case("pretty", LogFormat::Pretty; "pretty")]
    #[test_case("xml", LogFormat::Pretty; "unknown")]
    fn test_format_parse(input: &str, expected: LogFormat) {
        assert_eq!(LogFormat::parse(input), expected);
    }

    #[test]
    fn test_from_settings_keeps_format_and_file() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            level: Some("debug".to_string()),
            file: Some(PathBuf::from("/tmp/waypoint.log")),
        };
        let config = LoggingConfig::from_settings(Some(&settings), false);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/waypoint.log")));
    }

    #[test]
    fn test_defaults_without_settings() {
        let config = LoggingConfig::from_settings(None, true);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file.is_none());
    }
}
