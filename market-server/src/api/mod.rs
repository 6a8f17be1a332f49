//! HTTP routes
//!
//! - [`health`] liveness
//! - [`auth`] registration, verification, login
//! - [`products`] catalog
//! - [`orders`] order lifecycle
//! - [`payment`] intents and the settlement webhook
//! - [`reviews`] eligibility and ratings
//! - [`upload`] product images
//! - [`admin`] operator reconciliation and status overrides

pub mod admin;
pub mod auth;
mod extract;
pub mod health;
pub mod orders;
pub mod payment;
pub mod products;
pub mod reviews;
pub mod upload;

pub use crate::utils::{AppError, AppResult};
pub use extract::{Json, Query};
