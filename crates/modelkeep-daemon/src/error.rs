//! HTTP-level errors and their mapping to core port errors.
//!
//! `HttpError` never crosses the crate boundary through the ports; it is
//! converted to `DaemonError` or `BuildError` first.

use modelkeep_core::{BuildError, DaemonError};
use thiserror::Error;

/// Result type alias for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors from talking to the daemon over HTTP.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The daemon answered with an error status.
    #[error("Daemon request to {url} failed with status {status}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// No connection could be made.
    #[error("Cannot connect to the daemon: {0}")]
    Connect(String),

    /// Other HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The configured base URL is unusable.
    #[error("Invalid daemon URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The body could not be decoded.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl HttpError {
    /// Classify a reqwest error.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Connect(err.to_string())
        } else {
            Self::Network(err)
        }
    }

    /// Map to the daemon port error. `model` turns a 404 into `NotFound`.
    pub(crate) fn into_daemon_error(self, model: Option<&str>) -> DaemonError {
        match self {
            Self::Status { status: 404, .. } if model.is_some() => {
                DaemonError::NotFound(model.unwrap_or_default().to_string())
            }
            Self::Status { status, body, .. } => DaemonError::Status {
                status,
                message: error_message(&body),
            },
            Self::Connect(reason) => DaemonError::Unreachable(reason),
            Self::Network(e) if e.is_decode() => DaemonError::InvalidResponse(e.to_string()),
            Self::Network(e) => DaemonError::Unreachable(e.to_string()),
            Self::InvalidUrl(e) => DaemonError::Unreachable(format!("invalid daemon URL: {e}")),
            Self::JsonParse(e) => DaemonError::InvalidResponse(e.to_string()),
        }
    }

    /// Map to the builder port error for a build or copy of `name`.
    pub(crate) fn into_build_error(self, name: &str) -> BuildError {
        match self {
            Self::Status { body, .. } => BuildError::Rejected {
                name: name.to_string(),
                message: error_message(&body),
            },
            Self::Connect(reason) => BuildError::Unavailable(reason),
            Self::Network(e) => BuildError::Unavailable(e.to_string()),
            Self::InvalidUrl(e) => BuildError::Unavailable(format!("invalid daemon URL: {e}")),
            Self::JsonParse(e) => BuildError::Rejected {
                name: name.to_string(),
                message: format!("unexpected response: {e}"),
            },
        }
    }
}

/// The daemon reports errors as `{"error": "..."}`; fall back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
