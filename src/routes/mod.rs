use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod cart;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod users;
pub mod wishlist;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/product", products::router())
        .nest("/order", orders::router())
        .nest("/user", users::router())
        .nest("/wishlist", wishlist::router())
        .nest("/cart", cart::router())
}
