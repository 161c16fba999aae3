//! API Handlers
//!
//! One handler per key-value operation. Each composes the local cache with
//! the backend:
//! - reads go through the cache and populate it on a backend hit
//! - writes and deletes invalidate the cached key after the backend accepts them
//! - listing bypasses the cache entirely

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::backend::{EtcdClient, KvBackend};
use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::models::{
    BackendStatus, ErrorResponse, GetResponse, HealthResponse, PutRequest, StatsResponse,
    SuccessResponse,
};

/// Application state shared across all handlers.
///
/// Both members are created once at startup. `backend` is `None` when the
/// client failed to construct; the gateway then stays degraded for its
/// whole lifetime.
#[derive(Clone)]
pub struct AppState {
    /// Local read-through cache
    pub cache: Arc<RwLock<CacheStore>>,
    /// Authoritative store
    pub backend: Option<Arc<dyn KvBackend>>,
}

impl AppState {
    pub fn new(cache: CacheStore, backend: Option<Arc<dyn KvBackend>>) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            backend,
        }
    }

    /// Builds the cache and the etcd client from configuration.
    ///
    /// A client construction error is logged and leaves the state without a
    /// backend instead of aborting startup.
    pub fn from_config(config: &Config) -> Self {
        let cache = CacheStore::new(config.cache_max_items, config.cache_ttl());

        let backend: Option<Arc<dyn KvBackend>> = match EtcdClient::new(&config.etcd_options()) {
            Ok(client) => {
                info!(endpoints = ?client.endpoints(), "etcd client initialized");
                Some(Arc::new(client))
            }
            Err(err) => {
                error!(error = %err, "Failed to initialize etcd client, running degraded");
                None
            }
        };

        Self::new(cache, backend)
    }

    /// Returns the backend, or the not-initialized error.
    pub fn backend(&self) -> Result<&Arc<dyn KvBackend>> {
        self.backend.as_ref().ok_or(GatewayError::NotInitialized)
    }
}

/// Extracts the percent-decoded key from the path.
fn decode_key(path: std::result::Result<Path<String>, PathRejection>) -> Result<String> {
    path.map(|Path(key)| key)
        .map_err(|rejection| GatewayError::MalformedRequest(rejection.body_text()))
}

/// Handler for GET /kv/:key
///
/// Serves fresh cached values directly. On a miss reads the backend and
/// caches the value; a missing key is reported as 404 and never cached.
pub async fn get_handler(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<GetResponse>> {
    let key = decode_key(path)?;
    let backend = state.backend()?;

    let cached = state.cache.write().await.get(&key);
    if let Some(value) = cached {
        debug!(key = %key, "cache hit");
        return Ok(Json(GetResponse::cached(key, value)));
    }

    match backend.get(&key).await {
        Ok(Some(value)) => {
            state.cache.write().await.set(key.clone(), value.clone());
            Ok(Json(GetResponse::fetched(key, value)))
        }
        Ok(None) => Err(GatewayError::NotFound),
        Err(err) => {
            error!(key = %key, error = %err, "Error getting key");
            Err(err.into())
        }
    }
}

/// Handler for POST /kv
///
/// Writes to the backend, then drops the cached copy so the next read
/// fetches the value the backend actually holds.
pub async fn put_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<PutRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>> {
    let Json(request) =
        body.map_err(|rejection| GatewayError::MalformedRequest(rejection.body_text()))?;
    let (key, value) = request.validate()?;
    let backend = state.backend()?;

    if let Err(err) = backend.put(&key, &value).await {
        error!(key = %key, error = %err, "Error putting key");
        return Err(err.into());
    }

    state.cache.write().await.delete(&key);
    Ok(Json(SuccessResponse::ok()))
}

/// Handler for DELETE /kv/:key
///
/// Deleting an absent key succeeds. The cache is only invalidated once the
/// backend confirms.
pub async fn delete_handler(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<SuccessResponse>> {
    let key = decode_key(path)?;
    let backend = state.backend()?;

    if let Err(err) = backend.delete(&key).await {
        error!(key = %key, error = %err, "Error deleting key");
        return Err(err.into());
    }

    state.cache.write().await.delete(&key);
    Ok(Json(SuccessResponse::ok()))
}

/// Handler for GET /kv
///
/// Returns every key and value straight from the backend.
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>> {
    let backend = state.backend()?;

    match backend.list().await {
        Ok(all) => Ok(Json(all)),
        Err(err) => {
            error!(error = %err, "Error listing keys");
            Err(err.into())
        }
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    let ttl_ms = u64::try_from(cache.ttl().as_millis()).unwrap_or(u64::MAX);

    Json(StatsResponse::new(&cache.stats(), cache.capacity(), ttl_ms))
}

/// Handler for GET /health
///
/// Probes the backend with a single read. Answers 503 when the client is
/// missing or the probe fails.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let backend = match &state.backend {
        None => BackendStatus::NotInitialized,
        Some(backend) => match backend.ping().await {
            Ok(()) => BackendStatus::Connected,
            Err(err) => {
                warn!(backend = backend.backend_name(), error = %err, "health probe failed");
                BackendStatus::Unreachable
            }
        },
    };

    let response = HealthResponse::new(backend);
    let status = if response.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Fallback for unknown routes, so every error body is JSON.
pub async fn not_found_handler() -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Route not found")))
}
