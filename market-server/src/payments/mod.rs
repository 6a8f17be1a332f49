//! Payments
//!
//! - [`gateway`] outbound intent creation
//! - [`service`] intent preconditions
//! - [`signature`] webhook authenticity
//! - [`webhook`] idempotent settlement

pub mod gateway;
pub mod service;
pub mod signature;
pub mod webhook;

pub use gateway::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent, StripeGateway};
pub use service::{PaymentError, PaymentService};
pub use signature::{SignatureError, sign_payload, verify_webhook_signature};
pub use webhook::{WebhookAck, WebhookError, WebhookProcessor};
