use std::{collections::HashMap, str::FromStr};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
    sea_query::OnConflict,
};

use crate::{
    audit,
    dto::products::{
        CreateProductRequest, CreatedProduct, ProductFilterQuery, ProductList, ReviewList,
        ReviewRequest, UpdateProductRequest,
    },
    entity::{
        brands::{self, Entity as Brands},
        categories::{self, Entity as Categories},
        product_images::{self, Entity as ProductImages},
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products, Model as ProductModel},
        reviews::{self, Entity as Reviews},
    },
    error::{AppError, AppResult, is_foreign_key_violation},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, ProductDetail, ProductImage, ProductView, Review},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Upper bound on the unfiltered catalog listing.
const LIST_LIMIT: u64 = 100;
const DEFAULT_SELLER: &str = "Flipkart";

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.product_id, r.user_id, u.name AS user_name, r.rating, r.comment,
           r.created_at, r.updated_at
    FROM reviews r
    LEFT JOIN users u ON u.id = r.user_id
"#;

/// Parse a `[min,max]` JSON pair. Bounds may be numbers or numeric strings.
pub fn parse_price_range(raw: &str) -> AppResult<(Decimal, Decimal)> {
    let invalid = || AppError::BadRequest("price_range must be a JSON pair [min,max]".into());

    let bounds: Vec<serde_json::Value> = serde_json::from_str(raw).map_err(|_| invalid())?;
    if bounds.len() != 2 {
        return Err(invalid());
    }
    let parse = |v: &serde_json::Value| -> AppResult<Decimal> {
        let text = match v {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.trim().to_string(),
            _ => return Err(invalid()),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| invalid())
    };
    let (min, max) = (parse(&bounds[0])?, parse(&bounds[1])?);
    if min > max {
        return Err(AppError::BadRequest(
            "price_range minimum exceeds maximum".into(),
        ));
    }
    Ok((min, max))
}

fn check_prices(price: Decimal, discount_price: Decimal) -> AppResult<()> {
    if price < Decimal::ZERO || discount_price < Decimal::ZERO {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }
    if discount_price > price {
        return Err(AppError::BadRequest(
            "Discount price cannot exceed price".into(),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Attach brand, category and images to each product with one query per table.
async fn build_views<C: ConnectionTrait>(
    conn: &C,
    products: Vec<ProductModel>,
) -> Result<Vec<ProductView>, DbErr> {
    if products.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
    let brand_ids: Vec<i64> = products.iter().map(|p| p.brand_id).collect();
    let category_ids: Vec<i64> = products.iter().map(|p| p.category_id).collect();

    let brand_names: HashMap<i64, String> = Brands::find()
        .filter(brands::Column::Id.is_in(brand_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|b| (b.id, b.name))
        .collect();
    let category_names: HashMap<i64, String> = Categories::find()
        .filter(categories::Column::Id.is_in(category_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut images: HashMap<i64, Vec<ProductImage>> = HashMap::new();
    for img in ProductImages::find()
        .filter(product_images::Column::ProductId.is_in(ids))
        .order_by_desc(product_images::Column::IsMain)
        .order_by_asc(product_images::Column::Id)
        .all(conn)
        .await?
    {
        images
            .entry(img.product_id)
            .or_default()
            .push(ProductImage::from(img));
    }

    Ok(products
        .into_iter()
        .map(|p| ProductView {
            brand_name: brand_names.get(&p.brand_id).cloned(),
            category_name: category_names.get(&p.category_id).cloned(),
            images: images.remove(&p.id).unwrap_or_default(),
            product: Product::from(p),
        })
        .collect())
}

async fn upsert_brand<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i64, DbErr> {
    Brands::insert(brands::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(brands::Column::Name)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Brands::find()
        .filter(brands::Column::Name.eq(name))
        .one(conn)
        .await?
        .map(|b| b.id)
        .ok_or_else(|| DbErr::RecordNotFound(format!("brand {name}")))
}

async fn upsert_category<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i64, DbErr> {
    Categories::insert(categories::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(categories::Column::Name)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Categories::find()
        .filter(categories::Column::Name.eq(name))
        .one(conn)
        .await?
        .map(|c| c.id)
        .ok_or_else(|| DbErr::RecordNotFound(format!("category {name}")))
}

/// Insert the image set; the first usable url is the main image.
async fn insert_images<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    urls: &[String],
) -> Result<(), DbErr> {
    let rows: Vec<product_images::ActiveModel> = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .enumerate()
        .map(|(idx, url)| product_images::ActiveModel {
            id: NotSet,
            product_id: Set(product_id),
            url: Set(url.to_string()),
            is_main: Set(idx == 0),
            created_at: NotSet,
        })
        .collect();
    if rows.is_empty() {
        return Ok(());
    }
    ProductImages::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn recompute_rating<C: ConnectionTrait>(conn: &C, product_id: i64) -> Result<(), DbErr> {
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        UPDATE products
        SET rating = COALESCE(
                (SELECT ROUND(AVG(rating)::numeric, 2) FROM reviews WHERE product_id = $1), 0),
            rating_count = (SELECT COUNT(*) FROM reviews WHERE product_id = $1),
            updated_at = NOW()
        WHERE id = $1
        "#,
        [product_id.into()],
    ))
    .await?;
    Ok(())
}

async fn product_view(state: &AppState, id: i64) -> AppResult<ProductView> {
    let product = match Products::find_by_id(id).one(&state.orm).await? {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product")),
    };
    build_views(&state.orm, vec![product])
        .await?
        .pop()
        .ok_or(AppError::NotFound("Product"))
}

pub async fn list_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let products = Products::find()
        .order_by_desc(ProdCol::CreatedAt)
        .order_by_desc(ProdCol::Id)
        .limit(LIST_LIMIT)
        .all(&state.orm)
        .await?;
    let items = build_views(&state.orm, products).await?;

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::total(total)),
    ))
}

pub async fn filtered_products(
    state: &AppState,
    query: ProductFilterQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let mut finder = Products::find();

    if let Some(category) = non_blank(query.category) {
        finder = finder
            .inner_join(Categories)
            .filter(categories::Column::Name.eq(category));
    }
    if let Some(raw) = non_blank(query.price_range) {
        let (min, max) = parse_price_range(&raw)?;
        finder = finder.filter(ProdCol::DiscountPrice.between(min, max));
    }
    if let Some(ratings) = query.ratings {
        finder = finder.filter(ProdCol::Rating.gte(Decimal::from(ratings)));
    }

    let products = finder
        .order_by_desc(ProdCol::CreatedAt)
        .order_by_desc(ProdCol::Id)
        .all(&state.orm)
        .await?;
    let items = build_views(&state.orm, products).await?;

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::total(total)),
    ))
}

pub async fn get_product(state: &AppState, id: i64) -> AppResult<ApiResponse<ProductDetail>> {
    let product = product_view(state, id).await?;

    let reviews = sqlx::query_as::<_, Review>(&format!(
        "{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC, r.id DESC"
    ))
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Product",
        ProductDetail { product, reviews },
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<CreatedProduct>> {
    ensure_admin(user)?;

    let name = payload.name.trim().to_string();
    let category = payload.category.trim().to_string();
    let brand = payload.brand.trim().to_string();
    if name.is_empty() || category.is_empty() || brand.is_empty() {
        return Err(AppError::BadRequest(
            "name, price, category and brand are required".into(),
        ));
    }
    let discount_price = payload.discount_price.unwrap_or(payload.price);
    check_prices(payload.price, discount_price)?;
    let stock = payload.stock.unwrap_or(0);
    if stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".into()));
    }

    let txn = state.orm.begin().await?;

    let brand_id = upsert_brand(&txn, &brand).await?;
    let category_id = upsert_category(&txn, &category).await?;

    let product = ProductActive {
        id: NotSet,
        name: Set(name),
        description: Set(non_blank(payload.description)),
        price: Set(payload.price),
        discount_price: Set(discount_price),
        stock: Set(stock),
        category_id: Set(category_id),
        brand_id: Set(brand_id),
        seller: Set(non_blank(payload.seller).unwrap_or_else(|| DEFAULT_SELLER.to_string())),
        rating: NotSet,
        rating_count: NotSet,
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    insert_images(&txn, product.id, &payload.images).await?;

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        CreatedProduct {
            product_id: product.id,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductView>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let existing = match Products::find_by_id(id).one(&txn).await? {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product")),
    };

    let price = payload.price.unwrap_or(existing.price);
    let discount_price = payload.discount_price.unwrap_or(existing.discount_price);
    check_prices(price, discount_price)?;
    if payload.stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("Stock cannot be negative".into()));
    }

    let mut active: ProductActive = existing.into();
    if let Some(name) = non_blank(payload.name) {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(non_blank(Some(description)));
    }
    if payload.price.is_some() {
        active.price = Set(price);
    }
    if payload.discount_price.is_some() {
        active.discount_price = Set(discount_price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(seller) = non_blank(payload.seller) {
        active.seller = Set(seller);
    }
    if let Some(brand) = non_blank(payload.brand) {
        active.brand_id = Set(upsert_brand(&txn, &brand).await?);
    }
    if let Some(category) = non_blank(payload.category) {
        active.category_id = Set(upsert_category(&txn, &category).await?);
    }
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    if let Some(images) = payload.images {
        ProductImages::delete_many()
            .filter(product_images::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        insert_images(&txn, id, &images).await?;
    }

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    let view = product_view(state, id).await?;
    Ok(ApiResponse::success("Product updated", view, None))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = match Products::delete_by_id(id).exec(&state.orm).await {
        Ok(r) => r,
        Err(err) if is_foreign_key_violation(&err) => {
            return Err(AppError::Conflict(
                "Product is referenced by existing orders".into(),
            ));
        }
        Err(err) => return Err(err.into()),
    };
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product"));
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_reviews(state: &AppState, product_id: i64) -> AppResult<ApiResponse<ReviewList>> {
    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound("Product"));
    }

    let items = sqlx::query_as::<_, Review>(&format!(
        "{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC, r.id DESC"
    ))
    .bind(product_id)
    .fetch_all(&state.pool)
    .await?;

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::total(total)),
    ))
}

/// One review per (product, user): a second submission overwrites the first.
pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    product_id: i64,
    payload: ReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".into(),
        ));
    }
    let comment = payload.comment.trim().to_string();
    if comment.is_empty() {
        return Err(AppError::BadRequest("Comment is required".into()));
    }

    let txn = state.orm.begin().await?;

    if Products::find_by_id(product_id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound("Product"));
    }

    Reviews::insert(reviews::ActiveModel {
        id: NotSet,
        product_id: Set(product_id),
        user_id: Set(user.user_id),
        rating: Set(payload.rating),
        comment: Set(comment),
        created_at: NotSet,
        updated_at: Set(Utc::now().into()),
    })
    .on_conflict(
        OnConflict::columns([reviews::Column::ProductId, reviews::Column::UserId])
            .update_columns([
                reviews::Column::Rating,
                reviews::Column::Comment,
                reviews::Column::UpdatedAt,
            ])
            .to_owned(),
    )
    .exec_without_returning(&txn)
    .await?;

    recompute_rating(&txn, product_id).await?;

    txn.commit().await?;

    let review = sqlx::query_as::<_, Review>(&format!(
        "{REVIEW_SELECT} WHERE r.product_id = $1 AND r.user_id = $2"
    ))
    .bind(product_id)
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "review_upsert",
        "reviews",
        serde_json::json!({ "product_id": product_id, "review_id": review.id }),
    )
    .await;

    Ok(ApiResponse::success("Review saved", review, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_range_accepts_numbers_and_strings() {
        assert_eq!(parse_price_range("[100, 500]").unwrap(), (dec!(100), dec!(500)));
        assert_eq!(
            parse_price_range(r#"["10.5", 20]"#).unwrap(),
            (dec!(10.5), dec!(20))
        );
    }

    #[test]
    fn price_range_rejects_malformed_input() {
        for raw in ["", "100-500", "[1]", "[1,2,3]", "[\"a\", 2]", "{\"min\":1}", "[9, 1]"] {
            assert!(
                matches!(parse_price_range(raw), Err(AppError::BadRequest(_))),
                "accepted {raw}"
            );
        }
    }

    #[test]
    fn discount_must_not_exceed_price() {
        assert!(check_prices(dec!(100), dec!(100)).is_ok());
        assert!(check_prices(dec!(100), dec!(80)).is_ok());
        assert!(check_prices(dec!(100), dec!(120)).is_err());
        assert!(check_prices(dec!(-1), dec!(-1)).is_err());
    }
}
