//! Authentication and authorization
//!
//! - [`JwtService`] - bearer token issue/validation
//! - [`CurrentUser`] - authenticated caller context
//! - [`require_auth`] / [`require_operator`] - middleware
//! - [`password`] - argon2 password hashing

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{is_public_route, require_auth, require_operator};
