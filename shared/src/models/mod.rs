//! Data models
//!
//! Shared between market-server and clients (via API).
//! All IDs are opaque strings; timestamps are Unix milliseconds.

pub mod order;
pub mod product;
pub mod review;
pub mod user;

// Re-exports
pub use order::*;
pub use product::*;
pub use review::*;
pub use user::*;
