use crate::{
    audit,
    db::DbPool,
    dto::wishlist::{
        AddWishlistRequest, UpdateWishlistRequest, UserWishlist, WishlistAction,
        WishlistPageQuery, WishlistProductList,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::ProductSummary,
    response::{ApiResponse, Meta},
    routes::params::normalize_page,
    state::AppState,
};

/// Page size of the paginated wishlist view.
const WISHLIST_PAGE_SIZE: i64 = 5;

const WISHLIST_PRODUCTS: &str = r#"
    SELECT p.id, p.name, p.price, p.discount_price, p.stock, p.rating,
           (SELECT pi.url FROM product_images pi
             WHERE pi.product_id = p.id
             ORDER BY pi.is_main DESC, pi.id ASC
             LIMIT 1) AS image
    FROM wishlist w
    JOIN products p ON p.id = w.product_id
    WHERE w.user_id = $1
    ORDER BY w.created_at DESC, w.id DESC
"#;

async fn wishlist_products(pool: &DbPool, user_id: i64) -> AppResult<Vec<ProductSummary>> {
    Ok(sqlx::query_as::<_, ProductSummary>(WISHLIST_PRODUCTS)
        .bind(user_id)
        .fetch_all(pool)
        .await?)
}

async fn wishlist_of(pool: &DbPool, user_id: i64) -> AppResult<UserWishlist> {
    let items = wishlist_products(pool, user_id).await?;
    Ok(UserWishlist {
        product_ids: items.iter().map(|p| p.id).collect(),
        items,
    })
}

async fn insert_entry(pool: &DbPool, user_id: i64, product_id: i64) -> AppResult<()> {
    let product_exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    if product_exists.is_none() {
        return Err(AppError::NotFound("Product"));
    }

    sqlx::query(
        r#"
        INSERT INTO wishlist (user_id, product_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, product_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn delete_entry(pool: &DbPool, user_id: i64, product_id: i64) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list_wishlist(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<WishlistProductList>> {
    let items = wishlist_products(&state.pool, user.user_id).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "OK",
        WishlistProductList { items },
        Some(Meta::total(total)),
    ))
}

/// Adding a product already on the list is a no-op.
pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: AddWishlistRequest,
) -> AppResult<ApiResponse<UserWishlist>> {
    insert_entry(&state.pool, user.user_id, payload.product_id).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "wishlist_add",
        "wishlist",
        serde_json::json!({ "product_id": payload.product_id }),
    )
    .await;

    let wishlist = wishlist_of(&state.pool, user.user_id).await?;
    Ok(ApiResponse::success("Added to wishlist", wishlist, None))
}

pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: i64,
) -> AppResult<ApiResponse<UserWishlist>> {
    let removed = delete_entry(&state.pool, user.user_id, product_id).await?;
    if removed > 0 {
        audit::record(
            &state.orm,
            Some(user.user_id),
            "wishlist_remove",
            "wishlist",
            serde_json::json!({ "product_id": product_id }),
        )
        .await;
    }

    let wishlist = wishlist_of(&state.pool, user.user_id).await?;
    Ok(ApiResponse::success("Removed from wishlist", wishlist, None))
}

pub async fn user_wishlist(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserWishlist>> {
    let wishlist = wishlist_of(&state.pool, user.user_id).await?;
    Ok(ApiResponse::success("OK", wishlist, None))
}

pub async fn admin_user_wishlist(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
) -> AppResult<ApiResponse<UserWishlist>> {
    ensure_admin(user)?;
    let wishlist = wishlist_of(&state.pool, user_id).await?;
    Ok(ApiResponse::success("OK", wishlist, None))
}

pub async fn wishlist_page(
    state: &AppState,
    user: &AuthUser,
    query: WishlistPageQuery,
) -> AppResult<ApiResponse<WishlistProductList>> {
    let (page, limit, offset) = normalize_page(query.page, query.page_size, WISHLIST_PAGE_SIZE);

    let items = sqlx::query_as::<_, ProductSummary>(&format!(
        "{WISHLIST_PRODUCTS} LIMIT $2 OFFSET $3"
    ))
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wishlist WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "OK",
        WishlistProductList { items },
        Some(meta),
    ))
}

pub async fn update_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateWishlistRequest,
) -> AppResult<ApiResponse<UserWishlist>> {
    match payload.action {
        WishlistAction::Add => {
            add_to_wishlist(
                state,
                user,
                AddWishlistRequest {
                    product_id: payload.product_id,
                },
            )
            .await
        }
        WishlistAction::Remove => remove_from_wishlist(state, user, payload.product_id).await,
    }
}
