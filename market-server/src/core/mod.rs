//! Core module: configuration, state, server and errors
//!
//! - [`Config`] server configuration
//! - [`ServerState`] shared service handles
//! - [`Server`] HTTP server
//! - [`ServerError`] startup errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::{Config, PaymentConfig};
pub use error::{Result, ServerError};
pub use server::{Server, build_app};
pub use state::ServerState;
