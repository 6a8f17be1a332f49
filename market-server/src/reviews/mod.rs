//! Reviews
//!
//! [`eligibility`] holds the ordered rule set; [`ReviewEngine`] applies it
//! and maintains the reviewed user's running average.

pub mod eligibility;
mod engine;

pub use eligibility::{Eligibility, IneligibleReason};
pub use engine::{ReviewEngine, ReviewError, ReviewResult};
