//! API Module
//!
//! HTTP handlers and routing for the gateway REST API.
//!
//! # Endpoints
//! - `GET /kv/:key` - Read a key through the cache
//! - `POST /kv` - Write a key
//! - `DELETE /kv/:key` - Delete a key
//! - `GET /kv` - List every key
//! - `GET /health` - Backend health probe
//! - `GET /stats` - Cache statistics

pub mod guard;
pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
