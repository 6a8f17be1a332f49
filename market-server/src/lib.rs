//! TitanMart market server
//!
//! Campus marketplace backend: listings, orders between one buyer and one
//! seller, gateway-settled payments and post-sale reviews.
//!
//! # Modules
//!
//! ```text
//! market-server/src/
//! ├── core/       # config, state, errors, HTTP server
//! ├── auth/       # JWT, argon2, auth middleware
//! ├── store/      # redb tables and transactional helpers
//! ├── catalog/    # listings
//! ├── orders/     # order engine and reconciliation
//! ├── payments/   # gateway adapter, signatures, webhook processing
//! ├── reviews/    # eligibility and rating aggregates
//! ├── users/      # registration, verification, login
//! ├── notify/     # outbound mail
//! ├── media/      # image storage
//! ├── api/        # HTTP routes and handlers
//! └── utils/      # logging, validation limits
//! ```

pub mod api;
pub mod auth;
pub mod catalog;
pub mod core;
pub mod media;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod store;
pub mod users;
pub mod utils;

pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState, build_app};
pub use orders::{OrderEngine, TransitionCause};
pub use payments::WebhookProcessor;
pub use reviews::ReviewEngine;
pub use store::MarketStore;
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Load `.env`, prepare the work directory and start logging
pub fn setup_environment() -> Result<Config, core::ServerError> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.work_dir)?;
    let logs_dir = config.logs_dir();
    std::fs::create_dir_all(&logs_dir)?;

    let logs_dir = logs_dir.to_string_lossy();
    // File output in production only
    let file_dir = config.is_production().then_some(&*logs_dir);
    init_logger_with_file(Some(config.log_level.as_str()), Some(config.log_json), file_dir);
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
 _____ _ _             __  __            _
|_   _(_) |_ __ _ _ _ |  \/  |__ _ _ _ _| |_
  | | | |  _/ _` | ' \| |\/| / _` | '_|  _|
  |_| |_|\__\__,_|_||_|_|  |_\__,_|_|  \__|
    "#
    );
}
