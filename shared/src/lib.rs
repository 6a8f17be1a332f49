//! Shared types for the campus marketplace
//!
//! Common types used by market-server and its clients: the unified error
//! system, domain models, money arithmetic and small utilities.

pub mod error;
pub mod models;
pub mod money;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
