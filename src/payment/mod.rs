//! Hosted-checkout payment providers.
//!
//! The checkout workflow only needs two calls from a provider: open a hosted
//! payment session and read its status back. [`PaymentGateway`] is that seam;
//! [`stripe::StripeGateway`] is the production implementation.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub mod stripe;

pub use stripe::StripeGateway;

/// Status value providers report once the customer has paid.
pub const PAYMENT_STATUS_PAID: &str = "paid";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment provider rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected payment provider response: {0}")]
    Decode(String),
}

/// One priced line of a hosted checkout page. `unit_amount` is in minor units.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLineItem {
    pub name: String,
    pub image: Option<String>,
    pub description: String,
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub currency: String,
    pub line_items: Vec<SessionLineItem>,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

/// The part of a provider session the verification step reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub payment_status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PAYMENT_STATUS_PAID
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Label stored as the order's payment method.
    fn provider_name(&self) -> &'static str;

    /// Create a single-payment hosted session. The provider's session object
    /// is returned untouched so callers can hand it to the browser.
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<serde_json::Value, PaymentError>;

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError>;
}
