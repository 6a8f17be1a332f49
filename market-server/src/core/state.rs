use std::sync::Arc;

use crate::auth::JwtService;
use crate::catalog::Catalog;
use crate::core::{Config, Result};
use crate::media::{LocalObjectStore, ObjectStore};
use crate::notify::{LogNotifier, Notifier};
use crate::orders::{OrderEngine, Reconciler};
use crate::payments::{PaymentGateway, PaymentService, StripeGateway, WebhookProcessor};
use crate::reviews::ReviewEngine;
use crate::store::MarketStore;
use crate::users::{StoreIdentityProvider, UserService};

/// Server state - shared handles to every service
///
/// Cloning is shallow; every field is either `Clone` over an `Arc` or an
/// `Arc` itself.
///
/// | Field | Type | Purpose |
/// |-------|------|---------|
/// | config | Config | immutable settings |
/// | store | MarketStore | redb database |
/// | jwt_service | Arc<JwtService> | bearer tokens |
/// | catalog | Catalog | product listings |
/// | orders | OrderEngine | order lifecycle |
/// | reconciler | Reconciler | operator reconciliation queue |
/// | payments | PaymentService | intent creation |
/// | webhooks | WebhookProcessor | settlement events |
/// | reviews | ReviewEngine | eligibility and ratings |
/// | users | UserService | registration and login |
/// | objects | Arc<dyn ObjectStore> | uploaded images |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: MarketStore,
    pub jwt_service: Arc<JwtService>,
    pub catalog: Catalog,
    pub orders: OrderEngine,
    pub reconciler: Reconciler,
    pub payments: PaymentService,
    pub webhooks: WebhookProcessor,
    pub reviews: ReviewEngine,
    pub users: UserService,
    pub objects: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("work_dir", &self.config.work_dir)
            .field("http_port", &self.config.http_port)
            .finish_non_exhaustive()
    }
}

impl ServerState {
    /// Wire services over an opened store and the given collaborators
    ///
    /// Usually called through [`initialize()`](Self::initialize); tests use
    /// it directly to inject fakes.
    pub fn new(
        config: Config,
        store: MarketStore,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let identity = Arc::new(StoreIdentityProvider::new(store.clone()));
        let orders = OrderEngine::new(store.clone());

        Self {
            catalog: Catalog::new(store.clone()),
            reconciler: Reconciler::new(store.clone()),
            payments: PaymentService::new(
                store.clone(),
                gateway,
                config.payment.currency.clone(),
            ),
            webhooks: WebhookProcessor::new(
                store.clone(),
                orders.clone(),
                config.payment.webhook_secret.clone(),
                config.payment.webhook_tolerance_secs,
            ),
            reviews: ReviewEngine::new(store.clone()),
            users: UserService::new(
                store.clone(),
                identity,
                notifier,
                jwt_service.clone(),
                config.allowed_email_domain.clone(),
            ),
            orders,
            objects,
            jwt_service,
            store,
            config,
        }
    }

    /// Initialize the server state
    ///
    /// 1. Create the work directory layout
    /// 2. Open the database at `WORK_DIR/market.redb`
    /// 3. Build the Stripe gateway, log notifier and local object store
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        std::fs::create_dir_all(config.uploads_dir())?;

        let store = MarketStore::open(config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Database opened");

        let gateway = StripeGateway::new(&config.payment)
            .map_err(|e| crate::core::ServerError::Gateway(e.to_string()))?;
        if config.payment.secret_key.is_none() {
            tracing::warn!("STRIPE_SECRET_KEY not set, payment intents will be refused");
        }
        if config.payment.webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set, every webhook will be rejected");
        }

        let objects = LocalObjectStore::new(
            config.uploads_dir(),
            config.public_base_url.clone(),
            config.max_upload_bytes,
        );

        Ok(Self::new(
            config.clone(),
            store,
            Arc::new(gateway),
            Arc::new(LogNotifier),
            Arc::new(objects),
        ))
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    pub fn is_operator(&self, identity: &str) -> bool {
        self.config.is_operator(identity)
    }
}
