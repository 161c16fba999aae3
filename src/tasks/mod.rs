//! Background Tasks Module
//!
//! # Tasks
//! - Expiry sweep: drops stale cache entries so they stop holding capacity

mod cleanup;

pub use cleanup::spawn_cleanup_task;
