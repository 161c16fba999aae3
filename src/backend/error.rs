//! Backend error types

use serde::Deserialize;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Failures talking to the authoritative store.
///
/// A missing key is not an error: reads return `Ok(None)` for it, so an
/// outage can never be mistaken for a 404.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Transport failure (refused, reset, timed out)
    #[error("etcd connection error: {0}")]
    Connection(String),

    /// The store answered with a non-success status
    #[error("etcd returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The store answered with something we could not decode
    #[error("etcd response error: {0}")]
    Protocol(String),

    /// The client could not be constructed
    #[error("etcd client configuration error: {0}")]
    Config(String),
}

/// Error body produced by the etcd JSON gateway.
#[derive(Debug, Default, Deserialize)]
struct GatewayStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: String,
}

impl BackendError {
    /// True for failures where another endpoint might succeed.
    pub fn is_connection(&self) -> bool {
        matches!(self, BackendError::Connection(_))
    }

    /// Builds a status error from a non-success response body.
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let parsed: GatewayStatus = serde_json::from_str(body).unwrap_or_default();
        let message = if !parsed.message.is_empty() {
            parsed.message
        } else if !parsed.error.is_empty() {
            parsed.error
        } else if !body.trim().is_empty() {
            body.trim().to_string()
        } else {
            "empty response body".to_string()
        };

        BackendError::Status { status, message }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Protocol(err.to_string())
        } else {
            BackendError::Connection(err.to_string())
        }
    }
}
