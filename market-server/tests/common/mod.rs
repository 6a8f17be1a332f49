//! Shared harness: a fully wired state over a temp directory with fake
//! gateway, notifier and object store.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tempfile::TempDir;

use market_server::auth::JwtConfig;
use market_server::media::{MediaError, ObjectStore};
use market_server::notify::{Notifier, NotifyError};
use market_server::payments::{
    GatewayError, IntentRequest, PaymentGateway, PaymentIntent, WebhookAck, WebhookError,
    sign_payload,
};
use market_server::{Config, MarketStore, ServerState};
use shared::models::{
    Product, ProductCategory, ProductCondition, ProductCreate, RegisterRequest, VerifyEmailRequest,
};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const JWT_SECRET: &str = "integration-secret-that-is-long-enough-for-hs256";
pub const OPERATOR: &str = "ops@csu.fullerton.edu";
pub const PASSWORD: &str = "titans-2024!";

#[derive(Default)]
pub struct CapturingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send(&self, to: &str, _subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(())
    }
}

impl CapturingNotifier {
    pub fn code_for(&self, email: &str) -> String {
        let sent = self.sent.lock().unwrap();
        let (_, body) = sent
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .expect("no mail sent");
        body.split_whitespace()
            .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
            .expect("no code in mail")
            .to_string()
    }
}

#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<IntentRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let n = requests.len();
        Ok(PaymentIntent {
            client_secret: format!("pi_fake_{n}_secret"),
            intent_id: format!("pi_fake_{n}"),
        })
    }
}

/// Keeps uploads in memory
#[derive(Default)]
pub struct MemoryObjects {
    pub objects: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put(
        &self,
        owner: &str,
        filename: &str,
        _content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        let mut objects = self.objects.lock().unwrap();
        objects.push((owner.to_string(), bytes.len()));
        Ok(format!("http://test/uploads/products/{owner}/{}-{filename}", objects.len()))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub state: ServerState,
    pub notifier: Arc<CapturingNotifier>,
    pub gateway: Arc<FakeGateway>,
    pub objects: Arc<MemoryObjects>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::local(
            dir.path().to_string_lossy().to_string(),
            JwtConfig::with_secret(JWT_SECRET),
        );
        config.payment.webhook_secret = Some(WEBHOOK_SECRET.to_string());
        config.operator_emails = vec![OPERATOR.to_string()];

        let store = MarketStore::open(config.database_path()).unwrap();
        let notifier = Arc::new(CapturingNotifier::default());
        let gateway = Arc::new(FakeGateway::default());
        let objects = Arc::new(MemoryObjects::default());
        let state = ServerState::new(
            config,
            store,
            gateway.clone(),
            notifier.clone(),
            objects.clone(),
        );
        Self {
            dir,
            state,
            notifier,
            gateway,
            objects,
        }
    }

    /// Register and verify `username@csu.fullerton.edu`, returning the identity
    pub async fn verified_user(&self, username: &str, full_name: &str) -> String {
        let email = format!("{username}@csu.fullerton.edu");
        self.state
            .users
            .register(&RegisterRequest {
                username: username.to_string(),
                password: PASSWORD.to_string(),
                email: email.clone(),
                full_name: full_name.to_string(),
            })
            .await
            .unwrap();
        let code = self.notifier.code_for(&email);
        self.state
            .users
            .verify_email(&VerifyEmailRequest {
                email: email.clone(),
                code,
            })
            .unwrap();
        email
    }

    pub fn listing(&self, seller: &str, title: &str, price: &str) -> Product {
        self.state
            .catalog
            .create(
                seller,
                ProductCreate {
                    title: title.to_string(),
                    description: format!("{title} in good shape"),
                    price: Decimal::from_str(price).unwrap(),
                    category: ProductCategory::Books,
                    condition: ProductCondition::Good,
                    images: vec![],
                    location: None,
                },
            )
            .unwrap()
    }

    pub fn token_for(&self, identity: &str, username: &str) -> String {
        self.state
            .get_jwt_service()
            .generate_token(identity, username)
            .unwrap()
    }
}

pub fn succeeded_event(event_id: &str, intent_id: &str, order_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": intent_id,
            "metadata": { "orderId": order_id, "userId": "buyer" }
        }}
    }))
    .unwrap()
}

pub fn signature(payload: &[u8]) -> String {
    sign_payload(payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp()).unwrap()
}

pub fn deliver(state: &ServerState, payload: &[u8]) -> Result<WebhookAck, WebhookError> {
    state
        .webhooks
        .handle_settlement_event(payload, Some(&signature(payload)))
}
