//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::guard::require_backend;
use super::handlers::{
    delete_handler, get_handler, health_handler, list_handler, not_found_handler, put_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// The key-value routes sit behind the availability guard. `/health` and
/// `/stats` stay reachable in degraded mode.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let kv = Router::new()
        .route("/kv", get(list_handler).post(put_handler))
        .route("/kv/", get(list_handler))
        .route("/kv/:key", get(get_handler).delete(delete_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_backend,
        ));

    Router::new()
        .merge(kv)
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .fallback(not_found_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
