//! Error codes shared by market-server and its clients
//!
//! The leading digit names the area:
//! - 0xxx: request shape
//! - 1xxx: authentication
//! - 2xxx: permission
//! - 4xxx: orders
//! - 5xxx: payments
//! - 6xxx: products (65xx: image upload)
//! - 7xxx: reviews
//! - 8xxx: accounts
//! - 9xxx: server and storage

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric code carried in every error envelope
///
/// Clients switch on the number, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // 0xxx
    ValidationFailed = 2,
    /// Body could not be read (wrong content type, oversized)
    InvalidRequest = 5,
    /// Body or query string did not decode
    InvalidFormat = 6,
    RequiredField = 7,
    ValueOutOfRange = 8,

    // 1xxx
    NotAuthenticated = 1001,
    /// Unknown username and wrong password alike
    InvalidCredentials = 1002,
    TokenExpired = 1003,
    TokenInvalid = 1004,
    EmailAlreadyVerified = 1006,
    /// Wrong email verification or password reset code
    VerificationCodeInvalid = 1007,
    ResetCodeExpired = 1008,

    // 2xxx
    PermissionDenied = 2001,
    OperatorRequired = 2002,
    NotOrderParty = 2003,

    // 4xxx
    OrderNotFound = 4001,
    OrderEmpty = 4002,
    /// Line items belong to more than one seller
    OrderMultiSeller = 4003,
    OrderInvalidTransition = 4004,
    /// Order stored, some listings still marked available
    OrderPartiallyCreated = 4005,
    OrderNotPending = 4006,
    OrderOwnListing = 4007,
    OrderDuplicateItem = 4008,
    OrderInvalidQuantity = 4009,
    OrderUnknownStatus = 4010,
    ReconciliationNotFound = 4011,

    // 5xxx
    WebhookSignatureInvalid = 5002,
    /// Gateway unreachable or timed out
    GatewayUnavailable = 5003,
    GatewayRejected = 5004,
    GatewayNotConfigured = 5005,
    /// Amount overflows or has no minor-unit form
    AmountInvalid = 5006,

    // 6xxx
    ProductNotFound = 6001,
    ProductInvalidPrice = 6002,
    ProductUnavailable = 6003,
    ProductUnknownCategory = 6004,
    ProductUnknownCondition = 6005,
    ProductTooManyImages = 6006,

    // 65xx
    FileTooLarge = 6501,
    UnsupportedFileFormat = 6502,
    NoFileProvided = 6504,
    EmptyFile = 6505,
    NoFilename = 6506,
    FileStorageFailed = 6509,
    TooManyFiles = 6510,

    // 7xxx
    ReviewOrderNotCompleted = 7001,
    ReviewNotParty = 7002,
    ReviewNotOtherParty = 7003,
    ReviewDuplicate = 7004,
    ReviewCommentTooLong = 7005,

    // 8xxx
    UserNotFound = 8001,
    EmailTaken = 8002,
    UsernameTaken = 8003,
    EmailDomainInvalid = 8004,
    UsernameInvalid = 8005,
    PasswordTooShort = 8006,

    // 9xxx
    InternalError = 9001,
    DatabaseError = 9002,
    /// Data file damaged
    StorageCorrupted = 9403,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Dependency failures a caller may retry unchanged
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::GatewayUnavailable | ErrorCode::DatabaseError)
    }

    /// Default English message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidRequest => "Request body could not be read",
            ErrorCode::InvalidFormat => "Request could not be decoded",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            ErrorCode::NotAuthenticated => "Login required",
            ErrorCode::InvalidCredentials => "Invalid username or password",
            ErrorCode::TokenExpired => "Session has expired, please log in again",
            ErrorCode::TokenInvalid => "Session token is invalid",
            ErrorCode::EmailAlreadyVerified => "Email already verified",
            ErrorCode::VerificationCodeInvalid => "Invalid verification code",
            ErrorCode::ResetCodeExpired => "Reset code has expired",

            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::OperatorRequired => "Operator role is required",
            ErrorCode::NotOrderParty => "You are not part of this order",

            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order must contain at least one item",
            ErrorCode::OrderMultiSeller => "All items in an order must come from one seller",
            ErrorCode::OrderInvalidTransition => "Order status transition is not allowed",
            ErrorCode::OrderPartiallyCreated => "Order requires reconciliation",
            ErrorCode::OrderNotPending => "Order is not awaiting payment",
            ErrorCode::OrderOwnListing => "You cannot order your own listing",
            ErrorCode::OrderDuplicateItem => "Product appears more than once in the order",
            ErrorCode::OrderInvalidQuantity => "Quantity must be at least 1",
            ErrorCode::OrderUnknownStatus => "Unrecognized order status",
            ErrorCode::ReconciliationNotFound => "Reconciliation entry not found",

            ErrorCode::WebhookSignatureInvalid => "Webhook signature verification failed",
            ErrorCode::GatewayUnavailable => "Payment gateway unavailable, please retry",
            ErrorCode::GatewayRejected => "Payment gateway rejected the request",
            ErrorCode::GatewayNotConfigured => "Payment gateway is not configured",
            ErrorCode::AmountInvalid => "Amount cannot be charged",

            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInvalidPrice => "Product has invalid price",
            ErrorCode::ProductUnavailable => "Product is no longer available",
            ErrorCode::ProductUnknownCategory => "Unknown product category",
            ErrorCode::ProductUnknownCondition => "Unknown product condition",
            ErrorCode::ProductTooManyImages => "Too many images for one listing",

            ErrorCode::FileTooLarge => "Image is too large",
            ErrorCode::UnsupportedFileFormat => "Only JPEG, PNG, GIF and WebP images are accepted",
            ErrorCode::NoFileProvided => "No image provided",
            ErrorCode::EmptyFile => "Image is empty",
            ErrorCode::NoFilename => "Image has no filename",
            ErrorCode::FileStorageFailed => "Image could not be stored",
            ErrorCode::TooManyFiles => "Too many images in one upload",

            ErrorCode::ReviewOrderNotCompleted => {
                "Order must be completed before leaving a review"
            }
            ErrorCode::ReviewNotParty => "You are not part of this order",
            ErrorCode::ReviewNotOtherParty => {
                "You can only review the other party in the transaction"
            }
            ErrorCode::ReviewDuplicate => "You have already reviewed this user for this order",
            ErrorCode::ReviewCommentTooLong => "Comment is too long",

            ErrorCode::UserNotFound => "User not found",
            ErrorCode::EmailTaken => "Email already registered",
            ErrorCode::UsernameTaken => "Username already taken",
            ErrorCode::EmailDomainInvalid => "Email address is not from the allowed domain",
            ErrorCode::UsernameInvalid => {
                "Username must be 3-20 characters (letters, numbers, underscore, hyphen only)"
            }
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::StorageCorrupted => "Data file is damaged",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Number with no [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use ErrorCode::*;
        let code = match value {
            2 => ValidationFailed,
            5 => InvalidRequest,
            6 => InvalidFormat,
            7 => RequiredField,
            8 => ValueOutOfRange,

            1001 => NotAuthenticated,
            1002 => InvalidCredentials,
            1003 => TokenExpired,
            1004 => TokenInvalid,
            1006 => EmailAlreadyVerified,
            1007 => VerificationCodeInvalid,
            1008 => ResetCodeExpired,

            2001 => PermissionDenied,
            2002 => OperatorRequired,
            2003 => NotOrderParty,

            4001 => OrderNotFound,
            4002 => OrderEmpty,
            4003 => OrderMultiSeller,
            4004 => OrderInvalidTransition,
            4005 => OrderPartiallyCreated,
            4006 => OrderNotPending,
            4007 => OrderOwnListing,
            4008 => OrderDuplicateItem,
            4009 => OrderInvalidQuantity,
            4010 => OrderUnknownStatus,
            4011 => ReconciliationNotFound,

            5002 => WebhookSignatureInvalid,
            5003 => GatewayUnavailable,
            5004 => GatewayRejected,
            5005 => GatewayNotConfigured,
            5006 => AmountInvalid,

            6001 => ProductNotFound,
            6002 => ProductInvalidPrice,
            6003 => ProductUnavailable,
            6004 => ProductUnknownCategory,
            6005 => ProductUnknownCondition,
            6006 => ProductTooManyImages,

            6501 => FileTooLarge,
            6502 => UnsupportedFileFormat,
            6504 => NoFileProvided,
            6505 => EmptyFile,
            6506 => NoFilename,
            6509 => FileStorageFailed,
            6510 => TooManyFiles,

            7001 => ReviewOrderNotCompleted,
            7002 => ReviewNotParty,
            7003 => ReviewNotOtherParty,
            7004 => ReviewDuplicate,
            7005 => ReviewCommentTooLong,

            8001 => UserNotFound,
            8002 => EmailTaken,
            8003 => UsernameTaken,
            8004 => EmailDomainInvalid,
            8005 => UsernameInvalid,
            8006 => PasswordTooShort,

            9001 => InternalError,
            9002 => DatabaseError,
            9403 => StorageCorrupted,

            _ => return Err(InvalidErrorCode(value)),
        };
        Ok(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
