//! Error types for the gateway
//!
//! Every failure a handler can produce, and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::backend::BackendError;
use crate::models::ErrorResponse;

// == Gateway Error Enum ==
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Client input failed validation
    #[error("{0}")]
    InvalidRequest(String),

    /// Request body or path could not be parsed
    #[error("Invalid request: {0}")]
    MalformedRequest(String),

    /// Key absent in the backend (single-key reads only)
    #[error("Key not found")]
    NotFound,

    /// Backend client failed to construct at startup
    #[error("Etcd client not initialized")]
    NotInitialized,

    /// Backend call failed
    #[error("Etcd service unavailable or error: {0}")]
    Backend(#[from] BackendError),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) | GatewayError::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::NotInitialized | GatewayError::Backend(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Body sent to the client. The `error` field is stable per variant;
    /// variable detail goes in `details`.
    pub fn to_body(&self) -> ErrorResponse {
        match self {
            GatewayError::InvalidRequest(msg) => ErrorResponse::new(msg.clone()),
            GatewayError::MalformedRequest(detail) => {
                ErrorResponse::with_details("Invalid request", detail.clone())
            }
            GatewayError::NotFound => ErrorResponse::new("Key not found"),
            GatewayError::NotInitialized => ErrorResponse::new("Etcd client not initialized"),
            GatewayError::Backend(err) => {
                ErrorResponse::with_details("Etcd service unavailable or error", err.to_string())
            }
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}

// == Result Type Alias ==
pub type Result<T> = std::result::Result<T, GatewayError>;
