//! Bootstrap data: two accounts, the base taxonomy and a starter catalog.
//!
//! Every insert tolerates existing rows, so running the seed again changes nothing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{
    db::DbPool,
    models::{ROLE_ADMIN, ROLE_USER},
    services::auth_service::hash_password,
};

const BRANDS: [&str; 6] = ["Apple", "Samsung", "Sony", "LG", "Nike", "Adidas"];

const CATEGORIES: [&str; 6] = [
    "Electronics",
    "Fashion",
    "Appliances",
    "Home",
    "Furniture",
    "Beauty, Toys and More",
];

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price: Decimal,
    discount_price: Decimal,
    stock: i32,
    category: &'static str,
    brand: &'static str,
    rating: Decimal,
    rating_count: i32,
    image: &'static str,
}

fn sample_products() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            name: "Apple iPhone 17 Pro Max (512GB) - Midnight Black",
            description: "6.8-inch Super Retina XDR display with ProMotion. Pro camera system with 48MP Main and enhanced night mode.",
            price: dec!(149900),
            discount_price: dec!(139900),
            stock: 40,
            category: "Electronics",
            brand: "Apple",
            rating: dec!(4.6),
            rating_count: 850,
            image: "https://www.mobileana.com/wp-content/uploads/2025/06/Apple-iPhone-17-Pro-Max-Cosmic-Orange.webp",
        },
        SeedProduct {
            name: "Samsung Galaxy S23 Ultra 5G (256GB)",
            description: "200MP camera, S Pen included, 5000mAh battery",
            price: dec!(124999),
            discount_price: dec!(109999),
            stock: 35,
            category: "Electronics",
            brand: "Samsung",
            rating: dec!(4.6),
            rating_count: 890,
            image: "https://cdn.mos.cms.futurecdn.net/Xq8br942qhpRuGKQeXHXoU.jpg",
        },
        SeedProduct {
            name: "Sony WH-1000XM5 Wireless Headphones",
            description: "Industry Leading Noise Canceling, 30 Hours Battery",
            price: dec!(34990),
            discount_price: dec!(28990),
            stock: 100,
            category: "Electronics",
            brand: "Sony",
            rating: dec!(4.7),
            rating_count: 2100,
            image: "https://www.sony.co.in/image/b20d6d097590058b010fb5a7b75970c9?fmt=png-alpha&wid=676&hei=400",
        },
        SeedProduct {
            name: "Nike Air Max 270 Running Shoes",
            description: "Comfortable running shoes with Air Max technology",
            price: dec!(12995),
            discount_price: dec!(9995),
            stock: 200,
            category: "Fashion",
            brand: "Nike",
            rating: dec!(4.3),
            rating_count: 567,
            image: "https://static.nike.com/a/images/t_web_pdp_535_v2/f_auto/pyyixbczj6u5kiwhpjik/W+AIR+MAX+270.png",
        },
        SeedProduct {
            name: "LG 55 inch OLED TV (OLED55C2PSC)",
            description: "4K Ultra HD Smart OLED TV with Dolby Vision IQ",
            price: dec!(149990),
            discount_price: dec!(119990),
            stock: 20,
            category: "Appliances",
            brand: "LG",
            rating: dec!(4.8),
            rating_count: 340,
            image: "https://vasanthandco.in/images/productimages/2126__product__Televisions__lg-55inch-139cm-oled55c2psc-4k-ultra-hd-smart-oled-tv-1.png",
        },
        SeedProduct {
            name: "Adidas Ultraboost 22 Running Shoes",
            description: "Premium running shoes with Boost midsole",
            price: dec!(16999),
            discount_price: dec!(11999),
            stock: 150,
            category: "Fashion",
            brand: "Adidas",
            rating: dec!(4.4),
            rating_count: 423,
            image: "https://www.stripe3.com/cdn/shop/files/IE1770_1_FOOTWEAR_Photography_SideLateralCenterView_grey.jpg?v=1689607754&width=1946",
        },
    ]
}

pub async fn run(pool: &DbPool) -> anyhow::Result<()> {
    ensure_user(pool, "Admin", "store@flipkart.com", "admin123", "9999999999", ROLE_ADMIN).await?;
    ensure_user(pool, "Test User", "test@test.com", "test123", "9876543210", ROLE_USER).await?;

    for brand in BRANDS {
        sqlx::query("INSERT INTO brands (name, logo) VALUES ($1, '') ON CONFLICT (name) DO NOTHING")
            .bind(brand)
            .execute(pool)
            .await?;
    }
    for category in CATEGORIES {
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(category)
            .execute(pool)
            .await?;
    }

    seed_products(pool).await?;

    tracing::info!("seed completed");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    name: &str,
    email: &str,
    password: &str,
    phone: &str,
    role: &str,
) -> anyhow::Result<()> {
    let password_hash = hash_password(password)?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, phone, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(phone)
    .bind(role)
    .execute(pool)
    .await?;

    if inserted.rows_affected() > 0 {
        tracing::info!(email, role, "seeded user");
    }
    Ok(())
}

/// Products are only seeded into an empty catalog.
async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    let existing: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    if existing.0 > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    let products = sample_products();
    for product in &products {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO products
                (name, description, price, discount_price, stock, category_id, brand_id,
                 seller, rating, rating_count)
            SELECT $1, $2, $3, $4, $5, c.id, b.id, 'Flipkart', $8, $9
            FROM categories c, brands b
            WHERE c.name = $6 AND b.name = $7
            RETURNING id
            "#,
        )
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.discount_price)
        .bind(product.stock)
        .bind(product.category)
        .bind(product.brand)
        .bind(product.rating)
        .bind(product.rating_count)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((product_id,)) = row else {
            tracing::warn!(product = product.name, "missing brand or category, skipped");
            continue;
        };

        sqlx::query("INSERT INTO product_images (product_id, url, is_main) VALUES ($1, $2, TRUE)")
            .bind(product_id)
            .bind(product.image)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!(count = products.len(), "seeded products");
    Ok(())
}
