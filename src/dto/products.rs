use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{ProductView, Review};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: String,
    pub brand: String,
    pub seller: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial product update. `images`, when present, replaces the image set.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub seller: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct ProductFilterQuery {
    /// Exact category name.
    pub category: Option<String>,
    /// JSON pair `[min,max]`, inclusive, applied to the discount price.
    pub price_range: Option<String>,
    /// Minimum stored rating.
    pub ratings: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub rating: i32,
    pub comment: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedProduct {
    pub product_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductView>)]
    pub items: Vec<ProductView>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReviewList {
    #[schema(value_type = Vec<Review>)]
    pub items: Vec<Review>,
}
