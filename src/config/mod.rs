//! Configuration management.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` (explicit path, or the platform config dir)
//! 3. `WAYPOINT_*` environment variables
//!
//! ```toml
//! data_dir = "/home/me/.local/share/waypoint"
//!
//! [history]
//! max_history_age_days = 30
//! max_recent_places = 20
//! address_bar_max_history_age = 7
//! max_navigation_depth = 100
//! max_typed_locations = 50
//!
//! [lookup]
//! region_lookup_url = "https://grid.example/api"
//! timeout_ms = 10000
//!
//! [logging]
//! format = "json"
//! level = "debug"
//! ```

use crate::gc::{DEFAULT_MAX_HISTORY_AGE_DAYS, MAX_HISTORY_AGE_ENV};
use crate::services::location_history::{
    DEFAULT_ADDRESS_BAR_MAX_AGE_DAYS, DEFAULT_MAX_TYPED_LOCATIONS,
};
use crate::services::navigation::DEFAULT_MAX_NAVIGATION_DEPTH;
use crate::services::recent_places::DEFAULT_MAX_RECENT_PLACES;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upper bound for list sizes and stack depth.
pub const MAX_LIST_LIMIT: usize = 10_000;

/// Main configuration for waypoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaypointConfig {
    /// Directory holding the history documents.
    pub data_dir: PathBuf,
    /// History limits.
    pub history: HistoryConfig,
    /// Grid service endpoints.
    pub lookup: LookupConfig,
    /// Logging settings, resolved by [`crate::observability`].
    pub logging: LoggingSettings,
    /// File the configuration was read from, if any.
    pub source: Option<PathBuf>,
}

/// History limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Teleport history retention in days; `0` keeps nothing.
    pub max_history_age_days: u32,
    /// Recent places shown; `0` disables tracking.
    pub max_recent_places: usize,
    /// Address-bar history retention in days.
    pub address_bar_max_history_age: u32,
    /// Bound on each of the back and forward stacks.
    pub max_navigation_depth: usize,
    /// Address-bar entries kept.
    pub max_typed_locations: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_age_days: DEFAULT_MAX_HISTORY_AGE_DAYS,
            max_recent_places: DEFAULT_MAX_RECENT_PLACES,
            address_bar_max_history_age: DEFAULT_ADDRESS_BAR_MAX_AGE_DAYS,
            max_navigation_depth: DEFAULT_MAX_NAVIGATION_DEPTH,
            max_typed_locations: DEFAULT_MAX_TYPED_LOCATIONS,
        }
    }
}

/// Grid service endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    /// Region lookup service; without one every name goes to search.
    pub region_lookup_url: Option<String>,
    /// Parcel info service.
    pub parcel_info_url: Option<String>,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            region_lookup_url: None,
            parcel_info_url: None,
            timeout_ms: 10_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive, e.g. `info` or `waypoint=debug`.
    pub level: Option<String>,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// History section.
    pub history: Option<ConfigFileHistory>,
    /// Lookup section.
    pub lookup: Option<ConfigFileLookup>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// `[history]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileHistory {
    /// Teleport history retention.
    pub max_history_age_days: Option<u32>,
    /// Recent places shown.
    pub max_recent_places: Option<usize>,
    /// Address-bar retention.
    pub address_bar_max_history_age: Option<u32>,
    /// Stack bound.
    pub max_navigation_depth: Option<usize>,
    /// Address-bar capacity.
    pub max_typed_locations: Option<usize>,
}

/// `[lookup]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLookup {
    /// Region lookup service.
    pub region_lookup_url: Option<String>,
    /// Parcel info service.
    pub parcel_info_url: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            history: HistoryConfig::default(),
            lookup: LookupConfig::default(),
            logging: LoggingSettings::default(),
            source: None,
        }
    }
}

/// Platform data directory for waypoint, or `.waypoint` if there is none.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".waypoint"),
        |dirs| dirs.data_dir().join("waypoint"),
    )
}

impl WaypointConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// is out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let mut config = Self::parse(&contents)?.with_env_overrides();
        config.source = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML configuration over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn parse(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/waypoint/` on macOS)
    /// 2. XDG config dir (`~/.config/waypoint/` for Unix compatibility)
    ///
    /// Falls back to defaults (plus env overrides) if no readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default().with_checked_env_overrides();
        };

        let candidates = [
            base_dirs.config_dir().join("waypoint").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("waypoint")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default().with_checked_env_overrides()
    }

    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(history) = file.history {
            let target = &mut config.history;
            if let Some(v) = history.max_history_age_days {
                target.max_history_age_days = v;
            }
            if let Some(v) = history.max_recent_places {
                target.max_recent_places = v;
            }
            if let Some(v) = history.address_bar_max_history_age {
                target.address_bar_max_history_age = v;
            }
            if let Some(v) = history.max_navigation_depth {
                target.max_navigation_depth = v;
            }
            if let Some(v) = history.max_typed_locations {
                target.max_typed_locations = v;
            }
        }
        if let Some(lookup) = file.lookup {
            config.lookup.region_lookup_url = lookup.region_lookup_url;
            config.lookup.parcel_info_url = lookup.parcel_info_url;
            if let Some(v) = lookup.timeout_ms {
                config.lookup.timeout_ms = v;
            }
            if let Some(v) = lookup.connect_timeout_ms {
                config.lookup.connect_timeout_ms = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Applies `WAYPOINT_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides, keeping `self` if the result is invalid.
    #[must_use]
    pub fn with_checked_env_overrides(self) -> Self {
        self.with_checked_overrides_from(|key| std::env::var(key).ok())
    }

    /// Like [`Self::with_overrides_from`], but falls back to `self` when the
    /// overridden config fails [`Self::validate`].
    #[must_use]
    pub fn with_checked_overrides_from(self, var: impl Fn(&str) -> Option<String>) -> Self {
        let overridden = self.clone().with_overrides_from(var);
        match overridden.validate() {
            Ok(()) => overridden,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid environment overrides");
                self
            },
        }
    }

    /// Applies overrides read through `var`.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            var: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            var(key).and_then(|v| v.trim().parse().ok())
        }

        if let Some(dir) = var("WAYPOINT_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = parsed(&var, MAX_HISTORY_AGE_ENV) {
            self.history.max_history_age_days = v;
        }
        if let Some(v) = parsed(&var, "WAYPOINT_MAX_RECENT_PLACES") {
            self.history.max_recent_places = v;
        }
        if let Some(v) = parsed(&var, "WAYPOINT_ADDRESS_BAR_MAX_HISTORY_AGE") {
            self.history.address_bar_max_history_age = v;
        }
        if let Some(v) = parsed(&var, "WAYPOINT_MAX_NAVIGATION_DEPTH") {
            self.history.max_navigation_depth = v;
        }
        if let Some(v) = parsed(&var, "WAYPOINT_MAX_TYPED_LOCATIONS") {
            self.history.max_typed_locations = v;
        }
        if let Some(url) = var("WAYPOINT_REGION_LOOKUP_URL") {
            self.lookup.region_lookup_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(url) = var("WAYPOINT_PARCEL_INFO_URL") {
            self.lookup.parcel_info_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(v) = parsed(&var, "WAYPOINT_HTTP_TIMEOUT_MS") {
            self.lookup.timeout_ms = v;
        }
        if let Some(level) = var("WAYPOINT_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(format) = var("WAYPOINT_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        self
    }

    /// Checks values that would otherwise fail later.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a zero navigation depth, a list
    /// limit above [`MAX_LIST_LIMIT`], or a service url that is not http(s).
    pub fn validate(&self) -> Result<()> {
        if self.history.max_navigation_depth == 0 {
            return Err(Error::InvalidInput(
                "history.max_navigation_depth must be at least 1".to_string(),
            ));
        }
        for (key, value) in [
            ("history.max_recent_places", self.history.max_recent_places),
            ("history.max_typed_locations", self.history.max_typed_locations),
            ("history.max_navigation_depth", self.history.max_navigation_depth),
        ] {
            if value > MAX_LIST_LIMIT {
                return Err(Error::InvalidInput(format!(
                    "{key} must be at most {MAX_LIST_LIMIT}, got {value}"
                )));
            }
        }
        for (key, url) in [
            ("lookup.region_lookup_url", &self.lookup.region_lookup_url),
            ("lookup.parcel_info_url", &self.lookup.parcel_info_url),
        ] {
            let Some(url) = url else { continue };
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| Error::InvalidInput(format!("{key}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::InvalidInput(format!(
                    "{key}: unsupported scheme '{}'",
                    parsed.scheme()
                )));
            }
        }
        Ok(())
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Replaces the history limits.
    #[must_use]
    pub const fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }
}
