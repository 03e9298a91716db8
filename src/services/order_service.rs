use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        CheckoutLineItem, CreateCheckoutSessionRequest, OrderList, OrderWithItems, PlacedOrder,
        PurchasedLineItem, VerifyPaymentRequest,
    },
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        product_images::{Column as ImageCol, Entity as ProductImages},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult, is_unique_violation},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    payment::{NewCheckoutSession, SessionLineItem},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const ORDER_STATUS_PROCESSING: &str = "Processing";
pub const ORDER_PAYMENT_PAID: &str = "Paid";

/// Largest value the `NUMERIC(10, 2)` line price columns hold.
pub const MAX_LINE_PRICE: Decimal = dec!(99999999.99);
/// Largest value the `NUMERIC(12, 2)` order total columns hold.
pub const MAX_ORDER_TOTAL: Decimal = dec!(9999999999.99);

/// Convert a major-unit amount to the provider's integer minor units (paise, cents).
pub fn to_minor_units(amount: Decimal) -> AppResult<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|minor| minor.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| AppError::BadRequest("Amount out of range".into()))
}

fn line_sum(acc: Decimal, unit: Decimal, qty: Decimal) -> AppResult<Decimal> {
    unit.checked_mul(qty)
        .and_then(|line| acc.checked_add(line))
        .filter(|total| *total <= MAX_ORDER_TOTAL)
        .ok_or_else(|| AppError::BadRequest("Order total out of range".into()))
}

/// `(total_price, total_price_after_discount)` over the purchased lines.
pub fn order_totals(items: &[PurchasedLineItem]) -> AppResult<(Decimal, Decimal)> {
    items
        .iter()
        .try_fold((Decimal::ZERO, Decimal::ZERO), |(full, paid), item| {
            let qty = Decimal::from(item.quantity);
            Ok((
                line_sum(full, item.price, qty)?,
                line_sum(paid, item.discount_price, qty)?,
            ))
        })
}

/// `ORDER-<epoch millis>-<8 hex>`; the random suffix keeps same-millisecond orders apart.
pub fn generate_order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORDER-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

pub fn session_line_items(products: &[CheckoutLineItem]) -> AppResult<Vec<SessionLineItem>> {
    products
        .iter()
        .map(|item| {
            if item.discount_price <= Decimal::ZERO || item.discount_price > MAX_LINE_PRICE {
                return Err(AppError::BadRequest(format!(
                    "Invalid price for product {}",
                    item.product_id
                )));
            }
            if item.quantity <= 0 {
                return Err(AppError::BadRequest(format!(
                    "Invalid quantity for product {}",
                    item.product_id
                )));
            }
            Ok(SessionLineItem {
                name: item.name.clone(),
                image: item.image.clone().filter(|i| !i.trim().is_empty()),
                description: format!(
                    "Brand: {}",
                    item.brand_name
                        .as_deref()
                        .filter(|b| !b.trim().is_empty())
                        .unwrap_or("N/A")
                ),
                unit_amount: to_minor_units(item.discount_price)?,
                quantity: item.quantity,
            })
        })
        .collect()
}

fn validate_purchased(items: &[PurchasedLineItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::BadRequest("No products provided".into()));
    }
    for item in items {
        let in_range = |amount: Decimal| amount >= Decimal::ZERO && amount <= MAX_LINE_PRICE;
        if !in_range(item.price) || !in_range(item.discount_price) {
            return Err(AppError::BadRequest(format!(
                "Invalid price for product {}",
                item.product_id
            )));
        }
        if item.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "Invalid quantity for product {}",
                item.product_id
            )));
        }
    }
    Ok(())
}

/// Provider session ids are opaque tokens; anything else never reaches the URL.
fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub async fn create_checkout_session(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCheckoutSessionRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.products.is_empty() {
        return Err(AppError::BadRequest("No products provided".into()));
    }

    let frontend_url = Some(payload.frontend_url.trim().to_string())
        .filter(|u| !u.is_empty())
        .or_else(|| state.config.frontend_url.clone())
        .ok_or_else(|| AppError::BadRequest("frontend_url is required".into()))?;
    let frontend_url = frontend_url.trim_end_matches('/');

    let line_items = session_line_items(&payload.products)?;

    let products_json = serde_json::to_string(&payload.products)
        .map_err(|e| AppError::Internal(e.into()))?;
    let mut metadata = BTreeMap::new();
    metadata.insert("user_id".to_string(), user.user_id.to_string());
    metadata.insert("products".to_string(), products_json);

    let session = NewCheckoutSession {
        currency: state.config.payment_currency.clone(),
        line_items,
        customer_email: payload.customer_email.filter(|e| !e.trim().is_empty()),
        success_url: format!(
            "{}/shipping/confirm?session_id={{CHECKOUT_SESSION_ID}}",
            frontend_url
        ),
        cancel_url: format!("{}/shipping/failed", frontend_url),
        metadata,
    };

    let created = state.payments.create_checkout_session(session).await?;
    tracing::info!(user_id = user.user_id, "checkout session created");

    Ok(ApiResponse::success("Checkout session created", created, None))
}

pub async fn verify_payment(
    state: &AppState,
    user: &AuthUser,
    payload: VerifyPaymentRequest,
) -> AppResult<ApiResponse<PlacedOrder>> {
    let session_id = payload.session_id.trim();
    if !is_valid_session_id(session_id) {
        return Err(AppError::BadRequest("Invalid session id".into()));
    }
    validate_purchased(&payload.products)?;

    let session = state.payments.retrieve_checkout_session(session_id).await?;
    if !session.is_paid() {
        return Err(AppError::BadRequest("Payment not completed".into()));
    }
    if let Some(owner) = session.metadata.get("user_id") {
        if owner != &user.user_id.to_string() {
            return Err(AppError::Forbidden(
                "Payment session belongs to another user".into(),
            ));
        }
    }

    let (total_price, total_after_discount) = order_totals(&payload.products)?;
    let shipping_address = match &payload.shipping_address {
        serde_json::Value::Null => None,
        value => Some(value.to_string()),
    };

    let mut product_ids: Vec<i64> = payload.products.iter().map(|l| l.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    let txn = state.orm.begin().await?;

    let already = Orders::find()
        .filter(OrderCol::TransactionId.eq(session.id.as_str()))
        .one(&txn)
        .await?;
    if already.is_some() {
        return Err(AppError::Conflict(
            "Order already recorded for this payment".into(),
        ));
    }

    let inserted = OrderActive {
        id: NotSet,
        order_number: Set(generate_order_number()),
        user_id: Set(user.user_id),
        total_price: Set(total_price),
        total_price_after_discount: Set(total_after_discount),
        order_status: Set(ORDER_STATUS_PROCESSING.to_string()),
        payment_status: Set(ORDER_PAYMENT_PAID.to_string()),
        payment_method: Set(Some(state.payments.provider_name().to_string())),
        transaction_id: Set(Some(session.id.clone())),
        shipping_address: Set(shipping_address),
        notes: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await;
    let order = match inserted {
        Ok(order) => order,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::Conflict(
                "Order already recorded for this payment".into(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    // Rows are locked in id order so checkouts sharing products cannot deadlock.
    let mut stock: HashMap<i64, i32> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.iter().copied()))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p.stock))
        .collect();
    if stock.len() != product_ids.len() {
        return Err(AppError::NotFound("Product"));
    }

    for line in &payload.products {
        OrderItemActive {
            id: NotSet,
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            discount_price: Set(line.discount_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(ProdCol::Id.eq(line.product_id))
            .exec(&txn)
            .await?;

        if let Some(remaining) = stock.get_mut(&line.product_id) {
            *remaining -= line.quantity;
            if *remaining < 0 {
                tracing::warn!(
                    product_id = line.product_id,
                    remaining = *remaining,
                    "stock oversold by paid order"
                );
            }
        }
    }

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_placed",
        "orders",
        serde_json::json!({ "order_id": order.id, "session_id": session.id }),
    )
    .await;
    tracing::info!(order_id = order.id, order_number = %order.order_number, "order placed");

    Ok(ApiResponse::success(
        "Order placed successfully",
        PlacedOrder {
            order_id: order.order_number,
            id: order.id,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let mut items = items_by_order(&state.orm, orders.iter().map(|o| o.id).collect()).await?;
    let orders: Vec<OrderWithItems> = orders
        .into_iter()
        .map(|o| OrderWithItems {
            items: items.remove(&o.id).unwrap_or_default(),
            order: Order::from(o),
        })
        .collect();

    let total = orders.len() as i64;
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(Meta::total(total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .filter(OrderCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound("Order")),
    };

    let mut items = items_by_order(&state.orm, vec![order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();
    attach_product_display(&state.orm, &mut items).await?;

    Ok(ApiResponse::success(
        "Ok",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        None,
    ))
}

/// Items of the given orders grouped by order id, in insertion order.
pub(crate) async fn items_by_order<C: ConnectionTrait>(
    conn: &C,
    order_ids: Vec<i64>,
) -> Result<HashMap<i64, Vec<OrderItem>>, DbErr> {
    let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }
    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::Id)
        .all(conn)
        .await?;
    for row in rows {
        grouped
            .entry(row.order_id)
            .or_default()
            .push(OrderItem::from(row));
    }
    Ok(grouped)
}

/// Fill in the current catalog name and main image; the price snapshot stays as stored.
async fn attach_product_display<C: ConnectionTrait>(
    conn: &C,
    items: &mut [OrderItem],
) -> Result<(), DbErr> {
    if items.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();

    let names: HashMap<i64, String> = Products::find()
        .filter(ProdCol::Id.is_in(ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let images: HashMap<i64, String> = ProductImages::find()
        .filter(ImageCol::ProductId.is_in(ids))
        .filter(ImageCol::IsMain.eq(true))
        .all(conn)
        .await?
        .into_iter()
        .map(|img| (img.product_id, img.url))
        .collect();

    for item in items.iter_mut() {
        item.product_name = names.get(&item.product_id).cloned();
        item.product_image = images.get(&item.product_id).cloned();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: Decimal, discount: Decimal, quantity: i32) -> PurchasedLineItem {
        PurchasedLineItem {
            product_id: 1,
            price,
            discount_price: discount,
            quantity,
        }
    }

    #[test]
    fn minor_units_round_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(100)).unwrap(), 10_000);
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1_999);
        assert_eq!(to_minor_units(dec!(0.005)).unwrap(), 1);
        assert_eq!(to_minor_units(dec!(12.344)).unwrap(), 1_234);
    }

    #[test]
    fn totals_sum_price_times_quantity() {
        let items = vec![line(dec!(150), dec!(100), 2), line(dec!(10.50), dec!(9.25), 3)];
        let (full, paid) = order_totals(&items).unwrap();
        assert_eq!(full, dec!(331.50));
        assert_eq!(paid, dec!(227.75));
        assert_eq!(order_totals(&[]).unwrap(), (Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn oversized_totals_are_bad_requests() {
        let huge = vec![line(Decimal::MAX, dec!(1), 2)];
        assert!(matches!(order_totals(&huge), Err(AppError::BadRequest(_))));

        let past_column = vec![line(MAX_LINE_PRICE, MAX_LINE_PRICE, i32::MAX)];
        assert!(matches!(order_totals(&past_column), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn purchased_prices_must_fit_the_price_column() {
        assert!(validate_purchased(&[line(MAX_LINE_PRICE, dec!(1), 1)]).is_ok());
        for bad in [
            line(Decimal::MAX, dec!(1), 2),
            line(dec!(100), dec!(100000000), 1),
            line(dec!(-1), dec!(1), 1),
        ] {
            assert!(matches!(
                validate_purchased(&[bad]),
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn minor_units_overflow_is_a_bad_request() {
        assert!(matches!(
            to_minor_units(Decimal::MAX),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn order_numbers_are_prefixed_and_distinct() {
        let a = generate_order_number();
        let b = generate_order_number();
        assert!(a.starts_with("ORDER-"));
        let suffix = a.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn session_lines_carry_brand_and_minor_amount() {
        let products = vec![CheckoutLineItem {
            product_id: 7,
            name: "Phone".into(),
            image: Some("https://img/p.png".into()),
            brand_name: None,
            discount_price: dec!(100),
            quantity: 2,
        }];
        let lines = session_line_items(&products).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_amount, 10_000);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].description, "Brand: N/A");
    }

    #[test]
    fn session_lines_reject_prices_past_the_column() {
        let products = vec![CheckoutLineItem {
            product_id: 7,
            name: "Yacht".into(),
            image: None,
            brand_name: None,
            discount_price: dec!(100000000),
            quantity: 1,
        }];
        assert!(matches!(
            session_line_items(&products),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn session_lines_reject_free_items() {
        let products = vec![CheckoutLineItem {
            product_id: 7,
            name: "Free".into(),
            image: None,
            brand_name: Some("Acme".into()),
            discount_price: Decimal::ZERO,
            quantity: 1,
        }];
        assert!(matches!(
            session_line_items(&products),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn purchased_lines_are_validated() {
        assert!(validate_purchased(&[]).is_err());
        assert!(validate_purchased(&[line(dec!(-1), dec!(0), 1)]).is_err());
        assert!(validate_purchased(&[line(dec!(5), dec!(4), 0)]).is_err());
        assert!(validate_purchased(&[line(dec!(5), dec!(4), 1)]).is_ok());
    }

    #[test]
    fn session_ids_are_restricted_to_token_characters() {
        assert!(is_valid_session_id("cs_test_a1B2c3"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("../admin"));
        assert!(!is_valid_session_id("cs test"));
    }
}
