use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, post, put},
};

use crate::{
    dto::orders::{
        AdminOrderList, CreateCheckoutSessionRequest, DeletedOrders, OrderList, OrderWithItems,
        PlacedOrder, UpdateOrderStatusRequest, VerifyPaymentRequest,
    },
    error::AppResult,
    extract::{AppJson, AppPath},
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    services::{admin_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/verify-payment", post(verify_payment))
        .route("/admin/all", get(list_all_orders))
        .route("/admin/delete-all", delete(delete_all_orders))
        .route("/admin/{id}", put(update_order_status))
        .route("/{id}", get(get_order))
}

#[utoipa::path(
    get,
    path = "/api/v1/order",
    responses(
        (status = 200, description = "Caller's orders with items", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/order/{id}",
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/v1/order/create-checkout-session",
    request_body = CreateCheckoutSessionRequest,
    responses(
        (status = 200, description = "Provider session object", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid line items"),
        (status = 500, description = "Payment provider error")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateCheckoutSessionRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = order_service::create_checkout_session(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/v1/order/verify-payment",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Order recorded", body = ApiResponse<PlacedOrder>),
        (status = 400, description = "Payment not completed"),
        (status = 403, description = "Session belongs to another user"),
        (status = 409, description = "Order already recorded for this session")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<VerifyPaymentRequest>,
) -> AppResult<Json<ApiResponse<PlacedOrder>>> {
    let resp = order_service::verify_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/order/admin/all",
    responses(
        (status = 200, description = "Every order with its buyer", body = ApiResponse<AdminOrderList>),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AdminOrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/v1/order/admin/{id}",
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 400, description = "Missing status"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/v1/order/admin/delete-all",
    responses(
        (status = 200, description = "All orders deleted", body = ApiResponse<DeletedOrders>),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DeletedOrders>>> {
    let resp = admin_service::delete_all_orders(&state, &user).await?;
    Ok(Json(resp))
}
