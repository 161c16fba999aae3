//! Availability Guard
//!
//! Runs in front of every key-value route. When the backend client never
//! initialized, every request is answered with 503 before its handler runs.
//! Connectivity is not probed here; handlers discover outages on their own
//! backend calls.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::handlers::AppState;
use crate::error::GatewayError;

pub async fn require_backend(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.backend.is_none() {
        warn!(
            method = %request.method(),
            uri = %request.uri(),
            "Rejecting request: etcd client not initialized"
        );
        return GatewayError::NotInitialized.into_response();
    }

    next.run(request).await
}
