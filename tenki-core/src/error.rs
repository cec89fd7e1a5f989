use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a weather or geocoding HTTP call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to send request to {service}: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse {service} JSON: {source}")]
    Parse {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{service} response has no `{section}` section")]
    MissingSection {
        service: &'static str,
        section: &'static str,
    },

    #[error("{service} response has an invalid `{field}` value: {value}")]
    InvalidValue {
        service: &'static str,
        field: &'static str,
        value: String,
    },
}

/// Why the location sensor could not produce a position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    PositionUnavailable(String),

    #[error("Location request timed out")]
    Timeout,

    #[error("Location not supported here: {0}")]
    Unsupported(String),

    #[error("Location error: {0}")]
    Other(String),
}
