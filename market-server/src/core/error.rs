use thiserror::Error;

use crate::auth::JwtError;
use crate::store::StorageError;

/// Startup and lifecycle errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JWT configuration error: {0}")]
    Jwt(#[from] JwtError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payment gateway setup failed: {0}")]
    Gateway(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
