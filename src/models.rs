use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::entity::{
    order_items::Model as OrderItemModel, orders::Model as OrderModel,
    product_images::Model as ProductImageModel, products::Model as ProductModel,
    user_addresses::Model as AddressModel, users::Model as UserModel,
};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// A user as the API exposes it; the credential hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            role: model.role,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub discount_price: Decimal,
    pub stock: i32,
    pub category_id: i64,
    pub brand_id: i64,
    pub seller: String,
    pub rating: Decimal,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductModel> for Product {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            discount_price: model.discount_price,
            stock: model.stock,
            category_id: model.category_id,
            brand_id: model.brand_id,
            seller: model.seller,
            rating: model.rating,
            rating_count: model.rating_count,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub id: i64,
    pub url: String,
    pub is_main: bool,
}

impl From<ProductImageModel> for ProductImage {
    fn from(model: ProductImageModel) -> Self {
        Self {
            id: model.id,
            url: model.url,
            is_main: model.is_main,
        }
    }
}

/// Catalog listing entry: the product row plus its taxonomy names and images.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub brand_name: Option<String>,
    pub category_name: Option<String>,
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Review {
    pub id: i64,
    pub product_id: i64,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductView,
    pub reviews: Vec<Review>,
}

/// Product summary used by wishlist and cart listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub discount_price: Decimal,
    pub stock: i32,
    pub rating: Decimal,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CartItem {
    pub id: i64,
    pub product_id: i64,
    pub user_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    pub total_price: Decimal,
    pub total_price_after_discount: Decimal,
    pub order_status: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    /// Shipping address snapshot as captured at checkout.
    #[schema(value_type = Object)]
    pub shipping_address: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        // Rows written outside this service may hold plain text rather than JSON.
        let shipping_address = model.shipping_address.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });
        Self {
            id: model.id,
            order_number: model.order_number,
            user_id: model.user_id,
            total_price: model.total_price,
            total_price_after_discount: model.total_price_after_discount,
            order_status: model.order_status,
            payment_status: model.payment_status,
            payment_method: model.payment_method,
            transaction_id: model.transaction_id,
            shipping_address,
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// A purchased line. `price`/`discount_price` are the snapshot taken at checkout;
/// `product_name`/`product_image` are read live from the catalog for display.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub discount_price: Decimal,
    pub product_name: Option<String>,
    pub product_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            discount_price: model.discount_price,
            product_name: None,
            product_image: None,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserAddress {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub phone: String,
    pub state: String,
    pub pincode: String,
    pub address: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AddressModel> for UserAddress {
    fn from(model: AddressModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            phone: model.phone,
            state: model.state,
            pincode: model.pincode,
            address: model.address,
            is_default: model.is_default,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
