//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::OrderNotFound
            | Self::ProductNotFound
            | Self::UserNotFound
            | Self::ReconciliationNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::OrderInvalidTransition
            | Self::OrderNotPending
            | Self::ProductUnavailable
            | Self::ReviewDuplicate
            | Self::EmailTaken
            | Self::UsernameTaken
            | Self::EmailAlreadyVerified => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied
            | Self::OperatorRequired
            | Self::NotOrderParty
            | Self::ReviewNotParty => StatusCode::FORBIDDEN,

            // 413 Payload Too Large
            Self::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            // 502 Bad Gateway
            Self::GatewayRejected => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            Self::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::StorageCorrupted
            | Self::FileStorageFailed
            | Self::GatewayNotConfigured
            | Self::OrderPartiallyCreated => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation and business rule errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
