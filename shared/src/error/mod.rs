//! Marketplace errors
//!
//! - [`ErrorCode`]: numeric code, HTTP status and default message
//! - [`ErrorCategory`]: area derived from the code's range
//! - [`AppError`]: code plus message and details
//! - [`ApiResponse`]: the JSON body of an error response
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::OrderMultiSeller);
//! assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);
//!
//! let err = AppError::validation("Missing required field")
//!     .with_detail("field", "title");
//!
//! let response = ApiResponse::error(&err);
//! assert_eq!(response.code, 2);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
