use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::ProductSummary;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddWishlistRequest {
    pub product_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WishlistAction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateWishlistRequest {
    pub product_id: i64,
    #[serde(rename = "type")]
    pub action: WishlistAction,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct WishlistPageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct WishlistProductList {
    #[schema(value_type = Vec<ProductSummary>)]
    pub items: Vec<ProductSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserWishlist {
    pub product_ids: Vec<i64>,
    pub items: Vec<ProductSummary>,
}
