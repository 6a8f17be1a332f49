//! Outbound notifications

use async_trait::async_trait;

pub const VERIFY_SUBJECT: &str = "Verify your TitanMart account";
pub const RESET_SUBJECT: &str = "Reset your TitanMart password";

pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

/// Delivery channel for account mail
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "notify", to, subject, body, "Notification");
        Ok(())
    }
}

pub fn verification_body(code: &str) -> String {
    format!(
        "Your TitanMart verification code is: {code}\n\
         Enter it in the app to activate your account."
    )
}

pub fn reset_body(code: &str) -> String {
    format!(
        "Your TitanMart password reset code is: {code}\n\
         It expires in 15 minutes. Ignore this message if you did not ask for it."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_accepts() {
        LogNotifier
            .send("a@csu.fullerton.edu", VERIFY_SUBJECT, &verification_body("123456"))
            .await
            .unwrap();
    }

    #[test]
    fn test_body_carries_code() {
        assert!(verification_body("654321").contains("654321"));
        assert!(reset_body("112233").contains("112233"));
    }
}
