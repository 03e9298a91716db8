use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, OrderItem};

/// A cart line as shown on the hosted payment page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutLineItem {
    pub product_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub brand_name: Option<String>,
    pub discount_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCheckoutSessionRequest {
    pub products: Vec<CheckoutLineItem>,
    /// Base URL the provider redirects back to.
    pub frontend_url: String,
    pub customer_email: Option<String>,
}

/// A purchased line with the prices the buyer saw.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchasedLineItem {
    pub product_id: i64,
    pub price: Decimal,
    pub discount_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub session_id: String,
    pub products: Vec<PurchasedLineItem>,
    #[schema(value_type = Object)]
    #[serde(default)]
    pub shipping_address: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlacedOrder {
    /// Externally visible order number.
    pub order_id: String,
    /// Internal key.
    pub id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: OrderWithItems,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<OrderWithItems>)]
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AdminOrderList {
    #[schema(value_type = Vec<AdminOrder>)]
    pub items: Vec<AdminOrder>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub order_status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedOrders {
    pub deleted: u64,
}
