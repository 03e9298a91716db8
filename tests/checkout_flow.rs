mod common;

use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use storefront_api::{
    dto::orders::{
        CheckoutLineItem, CreateCheckoutSessionRequest, PurchasedLineItem,
        UpdateOrderStatusRequest, VerifyPaymentRequest,
    },
    entity::{OrderItems, Orders, Products},
    error::AppError,
    services::{admin_service, order_service},
};

use common::{create_product, create_user, product_request};

fn purchase(session_id: &str, product_id: i64, quantity: i32) -> VerifyPaymentRequest {
    VerifyPaymentRequest {
        session_id: session_id.into(),
        products: vec![PurchasedLineItem {
            product_id,
            price: dec!(150),
            discount_price: dec!(100),
            quantity,
        }],
        shipping_address: serde_json::json!({
            "name": "Buyer",
            "address": "12 Market Road",
            "pincode": "560001"
        }),
    }
}

// Checkout: hosted session -> unpaid verification -> paid verification -> replay.
#[tokio::test]
async fn paid_session_records_one_order_and_decrements_stock() -> anyhow::Result<()> {
    let Some(ctx) = common::setup().await? else {
        return Ok(());
    };
    let state = &ctx.state;

    let admin = create_user(state, "admin", "admin@example.com").await?;
    let buyer = create_user(state, "user", "buyer@example.com").await?;
    let product_id = create_product(
        state,
        &admin,
        product_request("Phone", dec!(150), Some(dec!(100)), 10),
    )
    .await?;

    // Session creation forwards minor-unit amounts and the buyer id.
    let session = order_service::create_checkout_session(
        state,
        &buyer,
        CreateCheckoutSessionRequest {
            products: vec![CheckoutLineItem {
                product_id,
                name: "Phone".into(),
                image: Some("https://img.example/main.png".into()),
                brand_name: Some("Acme".into()),
                discount_price: dec!(100),
                quantity: 2,
            }],
            frontend_url: "http://shop.example/".into(),
            customer_email: Some(buyer.email.clone()),
        },
    )
    .await?;
    assert_eq!(session.data.unwrap()["id"], "cs_test_stub");
    {
        let created = ctx.gateway.created.lock().unwrap();
        let sent = created.last().expect("session sent to provider");
        assert_eq!(sent.line_items[0].unit_amount, 10_000);
        assert_eq!(sent.line_items[0].description, "Brand: Acme");
        assert_eq!(sent.metadata["user_id"], buyer.user_id.to_string());
        assert!(sent.metadata["products"].contains("\"product_id\""));
        assert_eq!(
            sent.success_url,
            "http://shop.example/shipping/confirm?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(sent.cancel_url, "http://shop.example/shipping/failed");
    }

    // Unpaid session: nothing is written.
    ctx.gateway.set_status("unpaid");
    let err = order_service::verify_payment(state, &buyer, purchase("cs_test_1", product_id, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Payment not completed"));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(OrderItems::find().count(&state.orm).await?, 0);

    // Paid session: one order, one item, stock down by the quantity.
    ctx.gateway.set_status("paid");
    ctx.gateway.set_owner(Some(buyer.user_id));
    let placed = order_service::verify_payment(state, &buyer, purchase("cs_test_1", product_id, 2))
        .await?
        .data
        .unwrap();
    assert!(placed.order_id.starts_with("ORDER-"));

    let detail = order_service::get_order(state, &buyer, placed.id).await?.data.unwrap();
    assert_eq!(detail.order.total_price, dec!(300));
    assert_eq!(detail.order.total_price_after_discount, dec!(200));
    assert_eq!(detail.order.order_status, "Processing");
    assert_eq!(detail.order.payment_status, "Paid");
    assert_eq!(detail.order.payment_method.as_deref(), Some("stripe"));
    assert_eq!(detail.order.transaction_id.as_deref(), Some("cs_test_1"));
    assert_eq!(detail.order.shipping_address.as_ref().unwrap()["pincode"], "560001");
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 2);
    assert_eq!(detail.items[0].product_name.as_deref(), Some("Phone"));
    assert_eq!(
        detail.items[0].product_image.as_deref(),
        Some("https://img.example/main.png")
    );

    let product = Products::find_by_id(product_id).one(&state.orm).await?.unwrap();
    assert_eq!(product.stock, 8);

    // Replaying the same session is rejected and changes nothing.
    let err = order_service::verify_payment(state, &buyer, purchase("cs_test_1", product_id, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(Orders::find().count(&state.orm).await?, 1);
    let product = Products::find_by_id(product_id).one(&state.orm).await?.unwrap();
    assert_eq!(product.stock, 8);

    // Another buyer cannot see the order.
    let other = create_user(state, "user", "other@example.com").await?;
    let err = order_service::get_order(state, &other, placed.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let mine = order_service::list_orders(state, &buyer).await?.data.unwrap();
    assert_eq!(mine.items.len(), 1);
    assert_eq!(mine.items[0].items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn multi_line_order_snapshots_each_line() -> anyhow::Result<()> {
    let Some(ctx) = common::setup().await? else {
        return Ok(());
    };
    let state = &ctx.state;

    let admin = create_user(state, "admin", "admin@example.com").await?;
    let buyer = create_user(state, "user", "buyer@example.com").await?;
    let phone = create_product(state, &admin, product_request("Phone", dec!(150), Some(dec!(100)), 10)).await?;
    let case = create_product(state, &admin, product_request("Case", dec!(20), Some(dec!(12.50)), 5)).await?;
    assert!(phone < case);

    // Higher id first: row locks are still taken in id order.
    let request = VerifyPaymentRequest {
        session_id: "cs_test_multi".into(),
        products: vec![
            PurchasedLineItem {
                product_id: case,
                price: dec!(20),
                discount_price: dec!(12.50),
                quantity: 3,
            },
            PurchasedLineItem {
                product_id: phone,
                price: dec!(150),
                discount_price: dec!(100),
                quantity: 1,
            },
        ],
        shipping_address: serde_json::json!({ "pincode": "560001" }),
    };
    let placed = order_service::verify_payment(state, &buyer, request).await?.data.unwrap();

    let detail = order_service::get_order(state, &buyer, placed.id).await?.data.unwrap();
    assert_eq!(detail.order.total_price, dec!(210));
    assert_eq!(detail.order.total_price_after_discount, dec!(137.50));
    assert_eq!(detail.items.len(), 2);
    assert_eq!(OrderItems::find().count(&state.orm).await?, 2);

    let case_line = detail.items.iter().find(|i| i.product_id == case).expect("case line");
    assert_eq!(case_line.quantity, 3);
    assert_eq!(case_line.price, dec!(20));
    assert_eq!(case_line.discount_price, dec!(12.50));
    let phone_line = detail.items.iter().find(|i| i.product_id == phone).expect("phone line");
    assert_eq!(phone_line.quantity, 1);
    assert_eq!(phone_line.discount_price, dec!(100));

    let phone_row = Products::find_by_id(phone).one(&state.orm).await?.unwrap();
    let case_row = Products::find_by_id(case).one(&state.orm).await?.unwrap();
    assert_eq!(phone_row.stock, 9);
    assert_eq!(case_row.stock, 2);

    // An amount past the price column never reaches the database.
    let err = order_service::verify_payment(
        state,
        &buyer,
        VerifyPaymentRequest {
            session_id: "cs_test_huge".into(),
            products: vec![PurchasedLineItem {
                product_id: phone,
                price: rust_decimal::Decimal::MAX,
                discount_price: dec!(1),
                quantity: 2,
            }],
            shipping_address: serde_json::Value::Null,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(Orders::find().count(&state.orm).await?, 1);

    Ok(())
}

#[tokio::test]
async fn failed_verification_rolls_back_every_write() -> anyhow::Result<()> {
    let Some(ctx) = common::setup().await? else {
        return Ok(());
    };
    let state = &ctx.state;

    let admin = create_user(state, "admin", "admin@example.com").await?;
    let buyer = create_user(state, "user", "buyer@example.com").await?;
    let product_id = create_product(
        state,
        &admin,
        product_request("Tablet", dec!(150), Some(dec!(100)), 1),
    )
    .await?;

    // Second line points at a product that does not exist.
    let mut request = purchase("cs_test_missing", product_id, 1);
    request.products.push(PurchasedLineItem {
        product_id: product_id + 1000,
        price: dec!(10),
        discount_price: dec!(10),
        quantity: 1,
    });
    let err = order_service::verify_payment(state, &buyer, request).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(OrderItems::find().count(&state.orm).await?, 0);
    let product = Products::find_by_id(product_id).one(&state.orm).await?.unwrap();
    assert_eq!(product.stock, 1);

    // Session issued to someone else.
    ctx.gateway.set_owner(Some(buyer.user_id + 1));
    let err = order_service::verify_payment(state, &buyer, purchase("cs_test_other", product_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Overselling is recorded; stock goes negative.
    ctx.gateway.set_owner(None);
    order_service::verify_payment(state, &buyer, purchase("cs_test_oversell", product_id, 3)).await?;
    let product = Products::find_by_id(product_id).one(&state.orm).await?.unwrap();
    assert_eq!(product.stock, -2);

    // Malformed input never reaches the provider.
    let err = order_service::verify_payment(state, &buyer, purchase("../x", product_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let err = order_service::verify_payment(state, &buyer, purchase("cs_test_zero", product_id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn admin_manages_all_orders() -> anyhow::Result<()> {
    let Some(ctx) = common::setup().await? else {
        return Ok(());
    };
    let state = &ctx.state;

    let admin = create_user(state, "admin", "admin@example.com").await?;
    let buyer = create_user(state, "user", "buyer@example.com").await?;
    let product_id = create_product(
        state,
        &admin,
        product_request("Laptop", dec!(150), Some(dec!(100)), 10),
    )
    .await?;

    let placed = order_service::verify_payment(state, &buyer, purchase("cs_test_a", product_id, 1))
        .await?
        .data
        .unwrap();
    order_service::verify_payment(state, &buyer, purchase("cs_test_b", product_id, 1)).await?;

    let err = admin_service::list_all_orders(state, &buyer).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let all = admin_service::list_all_orders(state, &admin).await?.data.unwrap();
    assert_eq!(all.items.len(), 2);
    assert_eq!(all.items[0].user_email.as_deref(), Some("buyer@example.com"));

    let err = admin_service::update_order_status(
        state,
        &admin,
        placed.id,
        UpdateOrderStatusRequest {
            order_status: "  ".into(),
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let updated = admin_service::update_order_status(
        state,
        &admin,
        placed.id,
        UpdateOrderStatusRequest {
            order_status: "Shipped".into(),
            notes: Some("Courier picked up".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.order_status, "Shipped");
    assert_eq!(updated.notes.as_deref(), Some("Courier picked up"));

    let err = admin_service::update_order_status(
        state,
        &admin,
        placed.id + 1000,
        UpdateOrderStatusRequest {
            order_status: "Shipped".into(),
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let deleted = admin_service::delete_all_orders(state, &admin).await?.data.unwrap();
    assert_eq!(deleted.deleted, 2);
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(OrderItems::find().count(&state.orm).await?, 0);

    Ok(())
}
