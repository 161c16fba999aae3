//! etcd Gateway - REST front end for an etcd cluster
//!
//! Exposes get/put/delete/list over HTTP with a local read-through cache
//! bounded by entry count (LRU) and age (TTL).

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
