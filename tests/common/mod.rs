#![allow(dead_code)]

use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ConnectionTrait, Set, Statement};
use storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::products::CreateProductRequest,
    entity::users::ActiveModel as UserActive,
    middleware::auth::AuthUser,
    payment::{CheckoutSession, NewCheckoutSession, PaymentError, PaymentGateway},
    services::{auth_service::hash_password, product_service},
    state::AppState,
};
use tokio::sync::{Mutex, MutexGuard};

// Integration tests share one database; run them one at a time.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

pub const TEST_SECRET: &str = "integration-test-secret";

/// In-process payment provider. Sessions report `payment_status` as configured.
pub struct StubGateway {
    payment_status: StdMutex<String>,
    session_owner: StdMutex<Option<String>>,
    pub created: StdMutex<Vec<NewCheckoutSession>>,
}

impl StubGateway {
    pub fn new(payment_status: &str) -> Self {
        Self {
            payment_status: StdMutex::new(payment_status.to_string()),
            session_owner: StdMutex::new(None),
            created: StdMutex::new(Vec::new()),
        }
    }

    pub fn set_status(&self, status: &str) {
        *self.payment_status.lock().unwrap() = status.to_string();
    }

    /// Make retrieved sessions carry this `user_id` in their metadata.
    pub fn set_owner(&self, user_id: Option<i64>) {
        *self.session_owner.lock().unwrap() = user_id.map(|id| id.to_string());
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    fn provider_name(&self) -> &'static str {
        "stripe"
    }

    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<serde_json::Value, PaymentError> {
        let count = session.line_items.len();
        self.created.lock().unwrap().push(session);
        Ok(serde_json::json!({
            "id": "cs_test_stub",
            "object": "checkout.session",
            "url": "https://checkout.example/cs_test_stub",
            "line_item_count": count,
        }))
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut metadata = std::collections::HashMap::new();
        if let Some(owner) = self.session_owner.lock().unwrap().clone() {
            metadata.insert("user_id".to_string(), owner);
        }
        Ok(CheckoutSession {
            id: session_id.to_string(),
            payment_status: self.payment_status.lock().unwrap().clone(),
            metadata,
        })
    }
}

pub struct TestContext {
    _guard: MutexGuard<'static, ()>,
    pub state: AppState,
    pub gateway: Arc<StubGateway>,
}

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        db_max_connections: 5,
        jwt_secret: TEST_SECRET.into(),
        stripe_secret_key: "sk_test_unused".into(),
        stripe_api_base: "http://127.0.0.1:9/v1".into(),
        payment_currency: "inr".into(),
        frontend_url: Some("http://localhost:5173".into()),
        seed_on_start: false,
    }
}

/// Connect, migrate and empty every table. `None` when no database is configured.
pub async fn setup() -> anyhow::Result<Option<TestContext>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            return Ok(None);
        }
    };

    let guard = DB_LOCK.lock().await;
    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;

    let gateway = Arc::new(StubGateway::new("paid"));
    let state = AppState::new(pool, test_config(&database_url), gateway.clone());

    state
        .orm
        .execute(Statement::from_string(
            state.orm.get_database_backend(),
            "TRUNCATE TABLE order_items, orders, cart_items, wishlist, reviews, product_images, \
             products, brands, categories, user_addresses, audit_logs, users \
             RESTART IDENTITY CASCADE",
        ))
        .await?;

    Ok(Some(TestContext {
        _guard: guard,
        state,
        gateway,
    }))
}

pub async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: NotSet,
        name: Set(format!("{role} account")),
        email: Set(email.to_string()),
        password_hash: Set(hash_password("password")?),
        phone: Set(None),
        role: Set(role.to_string()),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
        role: user.role,
    })
}

pub fn product_request(name: &str, price: Decimal, discount: Option<Decimal>, stock: i32) -> CreateProductRequest {
    CreateProductRequest {
        name: name.to_string(),
        description: Some(format!("{name} description")),
        price,
        discount_price: discount,
        stock: Some(stock),
        category: "Electronics".into(),
        brand: "Acme".into(),
        seller: None,
        images: vec![
            "https://img.example/main.png".into(),
            "https://img.example/side.png".into(),
        ],
    }
}

pub async fn create_product(
    state: &AppState,
    admin: &AuthUser,
    request: CreateProductRequest,
) -> anyhow::Result<i64> {
    let resp = product_service::create_product(state, admin, request).await?;
    Ok(resp.data.expect("created product").product_id)
}
