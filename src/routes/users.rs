use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};

use crate::{
    dto::{
        orders::OrderList,
        users::{AddressList, AddressRequest, UpdateProfileRequest, UserList},
        wishlist::{UpdateWishlistRequest, UserWishlist, WishlistPageQuery, WishlistProductList},
    },
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    middleware::auth::AuthUser,
    models::{User, UserAddress},
    response::ApiResponse,
    services::{admin_service, order_service, user_service, wishlist_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/orders", get(user_orders))
        .route("/wishlist", get(user_wishlist).put(put_wishlist))
        .route("/wishlist-products", get(wishlist_products))
        .route("/update-wishlist", post(update_wishlist))
        .route("/{user_id}", get(get_user).put(update_profile))
        .route("/{user_id}/deactivate", put(deactivate_user))
        .route("/{user_id}/addresses", get(list_addresses).post(add_address))
        .route(
            "/{user_id}/addresses/{address_id}",
            put(update_address).delete(delete_address),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/user",
    responses(
        (status = 200, description = "All users", body = ApiResponse<UserList>),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = admin_service::list_users(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/user/orders",
    responses(
        (status = 200, description = "Caller's orders", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn user_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/user/wishlist",
    responses(
        (status = 200, description = "Wishlisted product ids and products", body = ApiResponse<UserWishlist>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn user_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserWishlist>>> {
    let resp = wishlist_service::user_wishlist(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/user/wishlist-products",
    params(WishlistPageQuery),
    responses(
        (status = 200, description = "One page of wishlisted products", body = ApiResponse<WishlistProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn wishlist_products(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(query): AppQuery<WishlistPageQuery>,
) -> AppResult<Json<ApiResponse<WishlistProductList>>> {
    let resp = wishlist_service::wishlist_page(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/v1/user/update-wishlist",
    request_body = UpdateWishlistRequest,
    responses(
        (status = 200, description = "Wishlist after the change", body = ApiResponse<UserWishlist>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<UpdateWishlistRequest>,
) -> AppResult<Json<ApiResponse<UserWishlist>>> {
    let resp = wishlist_service::update_wishlist(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/v1/user/wishlist",
    request_body = UpdateWishlistRequest,
    responses(
        (status = 200, description = "Wishlist after the change", body = ApiResponse<UserWishlist>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn put_wishlist(
    state: State<AppState>,
    user: AuthUser,
    payload: AppJson<UpdateWishlistRequest>,
) -> AppResult<Json<ApiResponse<UserWishlist>>> {
    update_wishlist(state, user, payload).await
}

#[utoipa::path(
    get,
    path = "/api/v1/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = ApiResponse<User>),
        (status = 403, description = "Not the account owner"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(user_id): AppPath<i64>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::get_user(&state, &user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/v1/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<User>),
        (status = 403, description = "Not the account owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(user_id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_profile(&state, &user, user_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/v1/user/{user_id}/deactivate",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Account deactivated", body = ApiResponse<User>),
        (status = 403, description = "Not the account owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(user_id): AppPath<i64>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::deactivate_user(&state, &user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/user/{user_id}/addresses",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Addresses, default first", body = ApiResponse<AddressList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(user_id): AppPath<i64>,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let resp = user_service::list_addresses(&state, &user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/v1/user/{user_id}/addresses",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address added", body = ApiResponse<UserAddress>),
        (status = 400, description = "Missing address fields")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn add_address(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(user_id): AppPath<i64>,
    AppJson(payload): AppJson<AddressRequest>,
) -> AppResult<Json<ApiResponse<UserAddress>>> {
    let resp = user_service::add_address(&state, &user, user_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/v1/user/{user_id}/addresses/{address_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("address_id" = i64, Path, description = "Address ID")
    ),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address updated", body = ApiResponse<UserAddress>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath((user_id, address_id)): AppPath<(i64, i64)>,
    AppJson(payload): AppJson<AddressRequest>,
) -> AppResult<Json<ApiResponse<UserAddress>>> {
    let resp = user_service::update_address(&state, &user, user_id, address_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/v1/user/{user_id}/addresses/{address_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("address_id" = i64, Path, description = "Address ID")
    ),
    responses(
        (status = 200, description = "Address deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath((user_id, address_id)): AppPath<(i64, i64)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = user_service::delete_address(&state, &user, user_id, address_id).await?;
    Ok(Json(resp))
}
