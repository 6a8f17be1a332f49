use std::path::PathBuf;

use crate::auth::JwtConfig;
use crate::core::ServerError;

/// Server configuration
///
/// # Environment
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | database, uploads and logs |
/// | HTTP_PORT | 3000 | HTTP listen port |
/// | ENVIRONMENT | development | development / production |
/// | LOG_LEVEL | info | default log level (`RUST_LOG` wins) |
/// | LOG_JSON | false | JSON log lines |
/// | PUBLIC_BASE_URL | http://localhost:3000 | prefix for media URLs |
/// | REQUEST_TIMEOUT_MS | 30000 | per-request timeout |
/// | ALLOWED_EMAIL_DOMAIN | csu.fullerton.edu | registration email suffix |
/// | OPERATOR_EMAILS | (empty) | comma-separated operator identities |
/// | MAX_UPLOAD_BYTES | 5242880 | per-image size cap |
/// | STRIPE_* / PAYMENT_CURRENCY / GATEWAY_TIMEOUT_MS / WEBHOOK_TOLERANCE_SECS | see [`PaymentConfig`] | |
/// | JWT_* | see [`JwtConfig`] | |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/var/lib/market HTTP_PORT=8080 cargo run -p market-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    /// development | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub public_base_url: String,
    pub request_timeout_ms: u64,
    /// Registration emails must end in `@<domain>`
    pub allowed_email_domain: String,
    /// Lowercased operator identities
    pub operator_emails: Vec<String>,
    pub max_upload_bytes: usize,
    pub payment: PaymentConfig,
    pub jwt: JwtConfig,
}

/// Payment gateway settings
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// STRIPE_SECRET_KEY; intents are refused when unset
    pub secret_key: Option<String>,
    /// STRIPE_WEBHOOK_SECRET; every webhook is rejected when unset
    pub webhook_secret: Option<String>,
    /// STRIPE_API_BASE (https://api.stripe.com)
    pub api_base: String,
    /// PAYMENT_CURRENCY (usd)
    pub currency: String,
    /// GATEWAY_TIMEOUT_MS (10000)
    pub timeout_ms: u64,
    /// WEBHOOK_TOLERANCE_SECS (300)
    pub webhook_tolerance_secs: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            webhook_secret: None,
            api_base: "https://api.stripe.com".to_string(),
            currency: "usd".to_string(),
            timeout_ms: 10_000,
            webhook_tolerance_secs: 300,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Split a comma-separated identity list, lowercased
pub fn parse_operator_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl PaymentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret_key: env_non_empty("STRIPE_SECRET_KEY"),
            webhook_secret: env_non_empty("STRIPE_WEBHOOK_SECRET"),
            api_base: std::env::var("STRIPE_API_BASE").unwrap_or(defaults.api_base),
            currency: std::env::var("PAYMENT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or(defaults.currency),
            timeout_ms: env_parse("GATEWAY_TIMEOUT_MS", defaults.timeout_ms),
            webhook_tolerance_secs: env_parse(
                "WEBHOOK_TOLERANCE_SECS",
                defaults.webhook_tolerance_secs,
            ),
        }
    }
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Fails only when the JWT secret is missing or too short in a build
    /// that does not allow a development key.
    pub fn from_env() -> Result<Self, ServerError> {
        let jwt = JwtConfig::from_env()?;
        let mut config = Self::local(
            std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            jwt,
        );

        config.http_port = env_parse("HTTP_PORT", 3000);
        config.environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        config.log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
        config.log_json = env_parse("LOG_JSON", false);
        config.public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", config.http_port));
        config.request_timeout_ms = env_parse("REQUEST_TIMEOUT_MS", 30_000);
        if let Ok(domain) = std::env::var("ALLOWED_EMAIL_DOMAIN") {
            config.allowed_email_domain = domain.trim_start_matches('@').to_lowercase();
        }
        config.operator_emails =
            parse_operator_list(&std::env::var("OPERATOR_EMAILS").unwrap_or_default());
        config.max_upload_bytes = env_parse("MAX_UPLOAD_BYTES", 5 * 1024 * 1024);
        config.payment = PaymentConfig::from_env();

        Ok(config)
    }

    /// Development defaults rooted at `work_dir`, without reading the environment
    pub fn local(work_dir: impl Into<String>, jwt: JwtConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            http_port: 3000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            public_base_url: "http://localhost:3000".to_string(),
            request_timeout_ms: 30_000,
            allowed_email_domain: "csu.fullerton.edu".to_string(),
            operator_emails: Vec::new(),
            max_upload_bytes: 5 * 1024 * 1024,
            payment: PaymentConfig::default(),
            jwt,
        }
    }

    /// Override part of the loaded configuration
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Result<Self, ServerError> {
        let mut config = Self::from_env()?;
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("market.redb")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("uploads")
    }

    pub fn logs_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn is_operator(&self, identity: &str) -> bool {
        let identity = identity.to_lowercase();
        self.operator_emails.iter().any(|op| *op == identity)
    }
}
