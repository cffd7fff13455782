//! Error types for riverwatch.
//!
//! Uses `thiserror` for library-style error definitions. Every variant maps
//! onto a stable [`ErrorKind`] so callers never see provider-specific shapes.

use thiserror::Error;

/// Errors that can occur in pipeline operations.
#[derive(Error, Debug)]
pub enum ConditionsError {
    /// Caller payload was missing or had an unusable required field
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Geocoder (or local validation) rejected the query
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Geocoder found nothing for the query
    #[error("no location matches '{0}'")]
    NoMatch(String),

    /// Latitude too close to a pole for the bounding box math
    #[error("latitude {0} is outside the supported range (-85, 85)")]
    UnsupportedLatitude(f64),

    /// Station network returned no series for the requested id
    #[error("no time series found for station {0}")]
    StationNotFound(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    /// JSON parsing failed
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Provider returned an error status
    #[error("{service} API error (HTTP {status})")]
    Api { service: &'static str, status: u16 },

    /// Response decoded but is unusable
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Caller deadline expired before the pipeline finished
    #[error("upstream calls did not finish within {0:?}")]
    Timeout(std::time::Duration),
}

impl From<reqwest::Error> for ConditionsError {
    fn from(err: reqwest::Error) -> Self {
        // Provider URLs carry API keys in their query strings.
        Self::Http(err.without_url())
    }
}

/// Stable error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedRequest,
    InvalidQuery,
    NoMatch,
    UnsupportedLatitude,
    StationNotFound,
    UpstreamError,
    UpstreamTimeout,
}

impl ErrorKind {
    /// Wire name for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedRequest => "malformed_request",
            Self::InvalidQuery => "invalid_query",
            Self::NoMatch => "no_match",
            Self::UnsupportedLatitude => "unsupported_latitude",
            Self::StationNotFound => "station_not_found",
            Self::UpstreamError => "upstream_error",
            Self::UpstreamTimeout => "upstream_timeout",
        }
    }
}

impl ConditionsError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Self::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Self::NoMatch(_) => ErrorKind::NoMatch,
            Self::UnsupportedLatitude(_) => ErrorKind::UnsupportedLatitude,
            Self::StationNotFound(_) => ErrorKind::StationNotFound,
            Self::Http(e) if e.is_timeout() => ErrorKind::UpstreamTimeout,
            Self::Timeout(_) => ErrorKind::UpstreamTimeout,
            Self::Http(_) | Self::Parse(_) | Self::Api { .. } | Self::InvalidResponse(_) => {
                ErrorKind::UpstreamError
            }
        }
    }

    /// Build an `Api` error for a non-success status.
    ///
    /// Provider bodies stay out of the error; callers only see the status.
    pub(crate) fn api(service: &'static str, status: u16) -> Self {
        Self::Api { service, status }
    }
}
