//! User Model

use serde::{Deserialize, Serialize};

/// Public user profile
///
/// `id` is the verified email address and doubles as the account key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    /// Stored lowercased, unique
    pub username: String,
    pub full_name: String,
    pub is_email_verified: bool,
    /// Mean of all received review ratings, 0 before the first
    pub rating: f64,
    pub total_ratings: u32,
    pub created_at: i64,
}

impl User {
    /// Full name, or username when the full name is blank
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }

    /// Fold one new rating into the running mean.
    pub fn apply_rating(&mut self, rating: u8) {
        let n = self.total_ratings as f64;
        self.rating = (self.rating * n + rating as f64) / (n + 1.0);
        self.total_ratings += 1;
    }
}

/// Registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

/// Login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Email verification payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub username: String,
}

/// Where the reset code went, with the mailbox partially hidden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub username: String,
    pub code: String,
    pub new_password: String,
}
