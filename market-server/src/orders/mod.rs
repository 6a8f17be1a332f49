//! Orders
//!
//! - [`OrderEngine`] creation and status transitions
//! - [`Reconciler`] operator reconciliation queue

mod engine;
mod error;
mod reconciliation;

pub use engine::{OrderEngine, TransitionCause};
pub use error::{OrderError, OrderResult};
pub use reconciliation::Reconciler;
