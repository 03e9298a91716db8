use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::{
    audit,
    dto::{
        orders::{AdminOrder, AdminOrderList, DeletedOrders, OrderWithItems, UpdateOrderStatusRequest},
        users::UserList,
    },
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, User},
    response::{ApiResponse, Meta},
    services::order_service::items_by_order,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AdminOrderList>> {
    ensure_admin(user)?;

    let orders = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let mut items = items_by_order(&state.orm, orders.iter().map(|o| o.id).collect()).await?;

    let mut user_ids: Vec<i64> = orders.iter().map(|o| o.user_id).collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    let owners: HashMap<i64, (String, String)> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        Users::find()
            .filter(UserCol::Id.is_in(user_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|u| (u.id, (u.name, u.email)))
            .collect()
    };

    let list: Vec<AdminOrder> = orders
        .into_iter()
        .map(|o| {
            let owner = owners.get(&o.user_id).cloned();
            AdminOrder {
                order: OrderWithItems {
                    items: items.remove(&o.id).unwrap_or_default(),
                    order: Order::from(o),
                },
                user_name: owner.as_ref().map(|(name, _)| name.clone()),
                user_email: owner.map(|(_, email)| email),
            }
        })
        .collect();

    let total = list.len() as i64;
    Ok(ApiResponse::success(
        "Orders",
        AdminOrderList { items: list },
        Some(Meta::total(total)),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let status = payload.order_status.trim();
    if status.is_empty() {
        return Err(AppError::BadRequest("order_status is required".into()));
    }

    let existing = match Orders::find_by_id(id).one(&state.orm).await? {
        Some(o) => o,
        None => return Err(AppError::NotFound("Order")),
    };

    let mut active: OrderActive = existing.into();
    active.order_status = Set(status.to_string());
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes).filter(|n| !n.trim().is_empty()));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "order_status": order.order_status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order status updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

/// Remove every order; items go with them through the cascade.
pub async fn delete_all_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DeletedOrders>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let result = Orders::delete_many().exec(&txn).await?;
    txn.commit().await?;

    tracing::warn!(deleted = result.rows_affected, admin_id = user.user_id, "all orders deleted");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "orders_delete_all",
        "orders",
        serde_json::json!({ "deleted": result.rows_affected }),
    )
    .await;

    Ok(ApiResponse::success(
        "All orders deleted",
        DeletedOrders {
            deleted: result.rows_affected,
        },
        None,
    ))
}

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;

    let users: Vec<User> = Users::find()
        .order_by_asc(UserCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let total = users.len() as i64;
    Ok(ApiResponse::success(
        "Users",
        UserList { items: users },
        Some(Meta::total(total)),
    ))
}
