use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};

use crate::{
    audit,
    dto::users::{AddressList, AddressRequest, UpdateProfileRequest},
    entity::{
        user_addresses::{ActiveModel as AddressActive, Column as AddressCol, Entity as UserAddresses},
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_self_or_admin},
    models::{User, UserAddress},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Clear the default flag on every address of `user_id` except `keep`.
async fn clear_default<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    keep: Option<i64>,
) -> Result<(), DbErr> {
    let mut update = UserAddresses::update_many()
        .col_expr(AddressCol::IsDefault, Expr::value(false))
        .col_expr(AddressCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(AddressCol::UserId.eq(user_id))
        .filter(AddressCol::IsDefault.eq(true));
    if let Some(id) = keep {
        update = update.filter(AddressCol::Id.ne(id));
    }
    update.exec(conn).await?;
    Ok(())
}

fn validate_address(payload: &AddressRequest) -> AppResult<()> {
    if payload.has_blank_field() {
        return Err(AppError::BadRequest(
            "name, phone, state, pincode and address are required".into(),
        ));
    }
    Ok(())
}

async fn find_user(state: &AppState, user_id: i64) -> AppResult<crate::entity::users::Model> {
    match Users::find_by_id(user_id).one(&state.orm).await? {
        Some(u) => Ok(u),
        None => Err(AppError::NotFound("User")),
    }
}

pub async fn get_user(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
) -> AppResult<ApiResponse<User>> {
    ensure_self_or_admin(user, user_id)?;
    let found = find_user(state, user_id).await?;
    Ok(ApiResponse::success("User", User::from(found), None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_self_or_admin(user, user_id)?;
    if payload.name.is_none() && payload.phone.is_none() {
        return Err(AppError::BadRequest("No update data provided".into()));
    }

    let existing = find_user(state, user_id).await?;
    let mut active: UserActive = existing.into();
    if let Some(name) = payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        active.name = Set(name);
    }
    if let Some(phone) = payload.phone {
        let phone = phone.trim().to_string();
        active.phone = Set(Some(phone).filter(|p| !p.is_empty()));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Profile updated",
        User::from(updated),
        None,
    ))
}

pub async fn deactivate_user(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
) -> AppResult<ApiResponse<User>> {
    ensure_self_or_admin(user, user_id)?;

    let existing = find_user(state, user_id).await?;
    let mut active: UserActive = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "user_deactivate",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Account deactivated",
        User::from(updated),
        None,
    ))
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
) -> AppResult<ApiResponse<AddressList>> {
    ensure_self_or_admin(user, user_id)?;

    let items: Vec<UserAddress> = UserAddresses::find()
        .filter(AddressCol::UserId.eq(user_id))
        .order_by_desc(AddressCol::IsDefault)
        .order_by_desc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(UserAddress::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::total(total)),
    ))
}

pub async fn add_address(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
    payload: AddressRequest,
) -> AppResult<ApiResponse<UserAddress>> {
    ensure_self_or_admin(user, user_id)?;
    validate_address(&payload)?;
    find_user(state, user_id).await?;

    let txn = state.orm.begin().await?;
    if payload.is_default {
        clear_default(&txn, user_id, None).await?;
    }
    let address = AddressActive {
        id: NotSet,
        user_id: Set(user_id),
        name: Set(payload.name.trim().to_string()),
        phone: Set(payload.phone.trim().to_string()),
        state: Set(payload.state.trim().to_string()),
        pincode: Set(payload.pincode.trim().to_string()),
        address: Set(payload.address.trim().to_string()),
        is_default: Set(payload.is_default),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Address added",
        UserAddress::from(address),
        None,
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
    address_id: i64,
    payload: AddressRequest,
) -> AppResult<ApiResponse<UserAddress>> {
    ensure_self_or_admin(user, user_id)?;
    validate_address(&payload)?;

    let txn = state.orm.begin().await?;
    let existing = UserAddresses::find_by_id(address_id)
        .filter(AddressCol::UserId.eq(user_id))
        .one(&txn)
        .await?;
    let existing = match existing {
        Some(a) => a,
        None => return Err(AppError::NotFound("Address")),
    };

    if payload.is_default {
        clear_default(&txn, user_id, Some(address_id)).await?;
    }

    let mut active: AddressActive = existing.into();
    active.name = Set(payload.name.trim().to_string());
    active.phone = Set(payload.phone.trim().to_string());
    active.state = Set(payload.state.trim().to_string());
    active.pincode = Set(payload.pincode.trim().to_string());
    active.address = Set(payload.address.trim().to_string());
    active.is_default = Set(payload.is_default);
    active.updated_at = Set(Utc::now().into());
    let address = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Address updated",
        UserAddress::from(address),
        None,
    ))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
    address_id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_self_or_admin(user, user_id)?;

    let result = UserAddresses::delete_many()
        .filter(AddressCol::Id.eq(address_id))
        .filter(AddressCol::UserId.eq(user_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Address"));
    }

    Ok(ApiResponse::success(
        "Address deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
