//! Request DTOs for the gateway API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::error::{GatewayError, Result};

/// Message returned when either field is missing.
pub const KEY_AND_VALUE_REQUIRED: &str = "Key and value required";

/// Request body for `POST /kv`.
///
/// Both fields are optional at the serde level so that a missing field is
/// reported as a validation error rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PutRequest {
    /// Key to write; must be a non-empty string
    #[serde(default)]
    pub key: Option<String>,
    /// Value to write; may be empty but must be present
    #[serde(default)]
    pub value: Option<String>,
}

impl PutRequest {
    /// Checks both fields and hands back the owned key and value.
    pub fn validate(self) -> Result<(String, String)> {
        match (self.key, self.value) {
            (Some(key), Some(value)) if !key.is_empty() => Ok((key, value)),
            _ => Err(GatewayError::InvalidRequest(
                KEY_AND_VALUE_REQUIRED.to_string(),
            )),
        }
    }
}
