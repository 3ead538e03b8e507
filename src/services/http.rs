//! Shared HTTP client settings for the grid service clients.

use crate::config::LookupConfig;
use crate::Error;
use std::time::Duration;

/// Timeout settings for grid service requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl HttpSettings {
    /// Takes timeouts from the `[lookup]` config section.
    #[must_use]
    pub const fn from_config(config: &LookupConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }
}

/// Builds a blocking HTTP client with the configured timeouts.
///
/// Must be called off the async runtime; the grid clients only do so from
/// their background lookup threads.
#[must_use]
pub fn build_http_client(settings: HttpSettings) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if settings.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(settings.timeout_ms));
    }
    if settings.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(settings.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build grid HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Maps a transport error to [`Error::OperationFailed`], logging its kind.
pub(crate) fn request_error(operation: &str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::warn!(
        operation,
        error = %e,
        error_kind,
        "Grid service request failed"
    );
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: format!("{error_kind} error: {e}"),
    }
}

/// Maps a non-success status to [`Error::OperationFailed`].
pub(crate) fn status_error(operation: &str, response: reqwest::blocking::Response) -> Error {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    tracing::warn!(operation, status = %status, body = %body, "Grid service returned error status");
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: format!("service returned status: {status}"),
    }
}
