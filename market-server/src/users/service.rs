use std::sync::Arc;

use rand::Rng;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse, RegisterRequest,
    ResetPasswordRequest, User, VerifyEmailRequest,
};
use shared::util::now_millis;
use thiserror::Error;

use super::identity::IdentityProvider;
use crate::auth::JwtService;
use crate::auth::password::hash_password;
use crate::notify::{Notifier, RESET_SUBJECT, VERIFY_SUBJECT, reset_body, verification_body};
use crate::security_log;
use crate::store::{MarketStore, PasswordReset, StorageError, UserRecord};
use crate::utils::validation::{MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("All fields are required: username, password, email, full_name")]
    MissingFields,

    #[error("Must use a valid email address ending in @{0}")]
    EmailDomain(String),

    #[error("Username must be 3-20 characters (letters, numbers, underscore, hyphen only)")]
    UsernameInvalid,

    #[error("Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters")]
    PasswordLength,

    #[error("{0} is too long")]
    TooLong(&'static str),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("User not found")]
    NotFound,

    #[error("Email already verified")]
    AlreadyVerified,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid reset code")]
    InvalidResetCode,

    #[error("Reset code has expired")]
    ResetCodeExpired,

    #[error("Failed to send reset code")]
    Delivery,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<redb::CommitError> for UserError {
    fn from(err: redb::CommitError) -> Self {
        Self::Storage(err.into())
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        let message = err.to_string();
        let code = match err {
            UserError::MissingFields => ErrorCode::RequiredField,
            UserError::EmailDomain(_) => ErrorCode::EmailDomainInvalid,
            UserError::UsernameInvalid => ErrorCode::UsernameInvalid,
            UserError::PasswordLength => ErrorCode::PasswordTooShort,
            UserError::TooLong(_) => ErrorCode::ValueOutOfRange,
            UserError::EmailTaken => ErrorCode::EmailTaken,
            UserError::UsernameTaken => ErrorCode::UsernameTaken,
            UserError::NotFound => ErrorCode::UserNotFound,
            UserError::AlreadyVerified => ErrorCode::EmailAlreadyVerified,
            UserError::InvalidCode => ErrorCode::VerificationCodeInvalid,
            UserError::InvalidCredentials => ErrorCode::InvalidCredentials,
            UserError::InvalidResetCode => ErrorCode::VerificationCodeInvalid,
            UserError::ResetCodeExpired => ErrorCode::ResetCodeExpired,
            UserError::Delivery => ErrorCode::InternalError,
            UserError::Internal(_) => ErrorCode::InternalError,
            UserError::Storage(e) => return e.into(),
        };
        AppError::with_message(code, message)
    }
}

pub fn is_valid_username(username: &str) -> bool {
    (3..=20).contains(&username.chars().count())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Lifetime of a password reset code
pub const RESET_CODE_TTL_MS: i64 = 15 * 60 * 1000;

/// `tuffy@x.edu` → `tu***@x.edu`
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let shown: String = local.chars().take(2).collect();
            format!("{shown}***@{domain}")
        }
        None => email.to_string(),
    }
}

fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// Account lifecycle: registration, verification, login, profile
#[derive(Clone)]
pub struct UserService {
    store: MarketStore,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    jwt: Arc<JwtService>,
    allowed_domain: String,
}

impl UserService {
    pub fn new(
        store: MarketStore,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        jwt: Arc<JwtService>,
        allowed_domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
            jwt,
            allowed_domain: allowed_domain.into().to_lowercase(),
        }
    }

    fn validate(&self, req: &RegisterRequest) -> Result<(), UserError> {
        if req.username.trim().is_empty()
            || req.password.is_empty()
            || req.email.trim().is_empty()
            || req.full_name.trim().is_empty()
        {
            return Err(UserError::MissingFields);
        }
        let email = req.email.trim().to_lowercase();
        if email.chars().count() > MAX_EMAIL_LEN {
            return Err(UserError::TooLong("Email"));
        }
        // Exactly one '@', a non-empty mailbox and the allowed domain
        let in_domain = match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain == self.allowed_domain,
            None => false,
        };
        if !in_domain {
            return Err(UserError::EmailDomain(self.allowed_domain.clone()));
        }
        if !is_valid_username(&req.username) {
            return Err(UserError::UsernameInvalid);
        }
        let password_len = req.password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
            return Err(UserError::PasswordLength);
        }
        if req.full_name.chars().count() > MAX_NAME_LEN {
            return Err(UserError::TooLong("Full name"));
        }
        Ok(())
    }

    /// Create an unverified account and mail its verification code.
    ///
    /// Delivery failure is logged; the account is created regardless.
    pub async fn register(&self, req: &RegisterRequest) -> Result<User, UserError> {
        self.validate(req)?;
        let email = req.email.trim().to_lowercase();
        let username = req.username.to_lowercase();

        let password = req.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| UserError::Internal(e.to_string()))?
            .map_err(|e| UserError::Internal(e.to_string()))?;

        let code = generate_code();
        let record = UserRecord {
            user: User {
                id: email.clone(),
                username: username.clone(),
                full_name: req.full_name.trim().to_string(),
                is_email_verified: false,
                rating: 0.0,
                total_ratings: 0,
                created_at: now_millis(),
            },
            password_hash,
            verification_code: Some(code.clone()),
            password_reset: None,
        };

        let txn = self.store.begin_write()?;
        if self.store.get_user_txn(&txn, &email)?.is_some() {
            return Err(UserError::EmailTaken);
        }
        if self.store.username_taken_txn(&txn, &username)? {
            return Err(UserError::UsernameTaken);
        }
        self.store.put_user_txn(&txn, &record)?;
        txn.commit()?;

        tracing::info!(user = %email, username = %username, "User registered");

        if let Err(e) = self
            .notifier
            .send(&email, VERIFY_SUBJECT, &verification_body(&code))
            .await
        {
            tracing::error!(to = %email, error = %e, "Verification email failed");
        }

        Ok(record.user)
    }

    pub fn verify_email(&self, req: &VerifyEmailRequest) -> Result<User, UserError> {
        let email = req.email.trim().to_lowercase();
        let txn = self.store.begin_write()?;
        let mut record = self
            .store
            .get_user_txn(&txn, &email)?
            .ok_or(UserError::NotFound)?;

        if record.user.is_email_verified {
            return Err(UserError::AlreadyVerified);
        }
        if record.verification_code.as_deref() != Some(req.code.trim()) {
            security_log!("WARN", "verification_code_mismatch", user = email.clone());
            return Err(UserError::InvalidCode);
        }

        record.user.is_email_verified = true;
        record.verification_code = None;
        self.store.put_user_txn(&txn, &record)?;
        txn.commit()?;

        tracing::info!(user = %email, "Email verified");
        Ok(record.user)
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, UserError> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(UserError::InvalidCredentials);
        }

        let identity = match self.identity.authenticate(&req.username, &req.password).await {
            Ok(identity) => identity,
            Err(e) => {
                security_log!("WARN", "login_failed", username = req.username.to_lowercase());
                return Err(e);
            }
        };

        let user = self.profile(&identity.identity)?;
        let token = self
            .jwt
            .generate_token(&identity.identity, &identity.username)
            .map_err(|e| UserError::Internal(e.to_string()))?;

        tracing::info!(user = %identity.identity, verified = identity.verified, "Login");
        Ok(LoginResponse { token, user })
    }

    /// Store a fresh reset code for `username` and mail it.
    ///
    /// A new request replaces any outstanding code. Unlike registration, a
    /// delivery failure fails the request.
    pub async fn request_password_reset(
        &self,
        req: &ForgotPasswordRequest,
    ) -> Result<ForgotPasswordResponse, UserError> {
        let username = req.username.trim().to_lowercase();
        if username.is_empty() {
            return Err(UserError::MissingFields);
        }
        let id = self.store.find_username(&username)?.ok_or(UserError::NotFound)?;

        let code = generate_code();
        let txn = self.store.begin_write()?;
        let mut record = self
            .store
            .get_user_txn(&txn, &id)?
            .ok_or(UserError::NotFound)?;
        record.password_reset = Some(PasswordReset {
            code: code.clone(),
            expires_at: now_millis() + RESET_CODE_TTL_MS,
        });
        self.store.put_user_txn(&txn, &record)?;
        txn.commit()?;

        if let Err(e) = self.notifier.send(&id, RESET_SUBJECT, &reset_body(&code)).await {
            tracing::error!(to = %id, error = %e, "Reset email failed");
            return Err(UserError::Delivery);
        }

        security_log!("INFO", "password_reset_requested", user = id.clone());
        Ok(ForgotPasswordResponse {
            message: "Password reset code sent to your email".to_string(),
            email: mask_email(&id),
        })
    }

    /// Replace the password if `code` matches the outstanding reset code.
    ///
    /// The code is single use: it is cleared on success and on expiry.
    pub async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<(), UserError> {
        let username = req.username.trim().to_lowercase();
        if username.is_empty() || req.code.trim().is_empty() || req.new_password.is_empty() {
            return Err(UserError::MissingFields);
        }
        let password_len = req.new_password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
            return Err(UserError::PasswordLength);
        }
        let id = self.store.find_username(&username)?.ok_or(UserError::NotFound)?;

        let password = req.new_password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| UserError::Internal(e.to_string()))?
            .map_err(|e| UserError::Internal(e.to_string()))?;

        let txn = self.store.begin_write()?;
        let mut record = self
            .store
            .get_user_txn(&txn, &id)?
            .ok_or(UserError::NotFound)?;
        let Some(pending) = record.password_reset.take() else {
            return Err(UserError::InvalidResetCode);
        };
        if pending.code != req.code.trim() {
            security_log!("WARN", "reset_code_mismatch", user = id.clone());
            return Err(UserError::InvalidResetCode);
        }
        if now_millis() > pending.expires_at {
            self.store.put_user_txn(&txn, &record)?;
            txn.commit()?;
            return Err(UserError::ResetCodeExpired);
        }

        record.password_hash = password_hash;
        self.store.put_user_txn(&txn, &record)?;
        txn.commit()?;

        security_log!("INFO", "password_reset", user = id.clone());
        Ok(())
    }

    pub fn profile(&self, id: &str) -> Result<User, UserError> {
        self.store
            .get_user(id)?
            .map(|r| r.user)
            .ok_or(UserError::NotFound)
    }
}
