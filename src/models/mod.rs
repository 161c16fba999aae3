//! Request and Response models for the gateway API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{PutRequest, KEY_AND_VALUE_REQUIRED};
pub use responses::{
    BackendStatus, ErrorResponse, GetResponse, HealthResponse, StatsResponse, SuccessResponse,
};
