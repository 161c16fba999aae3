//! Configuration Module
//!
//! Loads gateway configuration from environment variables once at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::EtcdOptions;
use crate::cache::{DEFAULT_MAX_ITEMS, DEFAULT_TTL_MS};

/// Gateway configuration parameters.
///
/// Every value falls back to a default when its variable is unset or
/// does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// etcd endpoint URLs
    pub endpoints: Vec<String>,
    /// etcd username, auth disabled when empty
    pub username: String,
    pub password: String,
    /// PEM CA bundle for TLS endpoints
    pub ca_cert: Option<PathBuf>,
    /// PEM client certificate and key for mutual TLS
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    /// Per-request etcd timeout in milliseconds
    pub etcd_timeout_ms: u64,
    /// Maximum number of cached keys
    pub cache_max_items: usize,
    /// Cache freshness window in milliseconds
    pub cache_ttl_ms: u64,
    /// HTTP listen port
    pub listen_port: u16,
    /// Expired-entry sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a Config from environment variables.
    ///
    /// # Environment Variables
    /// - `ETCD_HOSTS` - Comma separated endpoints (default: `http://localhost:2379`)
    /// - `ETCD_USERNAME` / `ETCD_PASSWORD` - Credentials (default: empty)
    /// - `ETCD_CA_CERT`, `ETCD_CERT`, `ETCD_KEY` - TLS PEM paths (default: unset)
    /// - `ETCD_TIMEOUT_MS` - Request timeout (default: 5000)
    /// - `CACHE_MAX_ITEMS` - Cache capacity, must be > 0 (default: 500)
    /// - `CACHE_TTL_MS` - Cache TTL, must be > 0 (default: 60000)
    /// - `PORT` - Listen port (default: 5001)
    /// - `CLEANUP_INTERVAL` - Sweep interval in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            endpoints: env::var("ETCD_HOSTS")
                .ok()
                .map(|v| parse_endpoints(&v))
                .filter(|hosts| !hosts.is_empty())
                .unwrap_or(defaults.endpoints),
            username: env::var("ETCD_USERNAME").unwrap_or_default(),
            password: env::var("ETCD_PASSWORD").unwrap_or_default(),
            ca_cert: path_var("ETCD_CA_CERT"),
            client_cert: path_var("ETCD_CERT"),
            client_key: path_var("ETCD_KEY"),
            etcd_timeout_ms: positive_var("ETCD_TIMEOUT_MS").unwrap_or(defaults.etcd_timeout_ms),
            cache_max_items: positive_var("CACHE_MAX_ITEMS")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(defaults.cache_max_items),
            cache_ttl_ms: positive_var("CACHE_TTL_MS").unwrap_or(defaults.cache_ttl_ms),
            listen_port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.listen_port),
            cleanup_interval: positive_var("CLEANUP_INTERVAL")
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Options for building the etcd client.
    pub fn etcd_options(&self) -> EtcdOptions {
        EtcdOptions {
            endpoints: self.endpoints.clone(),
            username: Some(self.username.clone()).filter(|u| !u.is_empty()),
            password: Some(self.password.clone()).filter(|p| !p.is_empty()),
            ca_cert: self.ca_cert.clone(),
            client_cert: self.client_cert.clone(),
            client_key: self.client_key.clone(),
            timeout: Duration::from_millis(self.etcd_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://localhost:2379".to_string()],
            username: String::new(),
            password: String::new(),
            ca_cert: None,
            client_cert: None,
            client_key: None,
            etcd_timeout_ms: 5000,
            cache_max_items: DEFAULT_MAX_ITEMS,
            cache_ttl_ms: DEFAULT_TTL_MS,
            listen_port: 5001,
            cleanup_interval: 1,
        }
    }
}

fn parse_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}

fn path_var(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

fn positive_var(name: &str) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}
