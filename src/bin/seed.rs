use chrono::Duration;
use waste_market_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    middleware::auth::issue_token,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    // The buyer is created first so it gets id 1, the default fallback user.
    let buyer_id = ensure_user(&pool, "buyer@example.com", "Northside Plastics", "buyer").await?;
    let seller_id = ensure_user(&pool, "seller@example.com", "Green Loop Recycling", "seller").await?;
    let admin_id = ensure_user(&pool, "admin@example.com", "Marketplace Admin", "admin").await?;

    let plastics = ensure_category(&pool, "Plastics", "plastics", "material").await?;
    let metals = ensure_category(&pool, "Metals", "metals", "material").await?;
    let upcycled = ensure_category(&pool, "Upcycled Goods", "upcycled-goods", "product").await?;

    seed_listings(&pool, seller_id, plastics, metals, upcycled).await?;

    println!("Seed completed. Buyer ID: {buyer_id}, Seller ID: {seller_id}, Admin ID: {admin_id}");

    if let Some(secret) = config.jwt_secret.as_deref() {
        for (label, id) in [("buyer", buyer_id), ("seller", seller_id), ("admin", admin_id)] {
            let token = issue_token(id, secret, Duration::hours(24))?;
            println!("{label} token: Bearer {token}");
        }
    }
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    full_name: &str,
    role: &str,
) -> anyhow::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO users (email, full_name, role, status)
        VALUES ($1, $2, $3, 'active')
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(full_name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(id)
}

async fn ensure_category(
    pool: &sqlx::PgPool,
    name: &str,
    slug: &str,
    listing_type: &str,
) -> anyhow::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO categories (name, slug, listing_type)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(listing_type)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_listings(
    pool: &sqlx::PgPool,
    seller_id: i64,
    plastics: i64,
    metals: i64,
    upcycled: i64,
) -> anyhow::Result<()> {
    let existing: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM listings WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_one(pool)
        .await?;
    if existing.0 > 0 {
        println!("Listings already seeded");
        return Ok(());
    }

    let listings = vec![
        (plastics, "Baled PET bottles", "Clear PET, post-consumer, 300kg bales", "material", 45, 1200, "kg"),
        (plastics, "HDPE regrind", "Mixed colour HDPE flakes", "material", 60, 800, "kg"),
        (metals, "Aluminium cans", "Compressed UBC bales", "material", 110, 500, "kg"),
        (upcycled, "Pallet wood bench", "Bench built from reclaimed pallets", "product", 15000, 3, "unit"),
    ];

    for (category_id, title, description, listing_type, price, quantity, unit) in listings {
        let (listing_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO listings
                (seller_id, category_id, title, description, listing_type, price, quantity, unit_measure, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active')
            RETURNING id
            "#,
        )
        .bind(seller_id)
        .bind(category_id)
        .bind(title)
        .bind(description)
        .bind(listing_type)
        .bind(price as i64)
        .bind(quantity as i32)
        .bind(unit)
        .fetch_one(pool)
        .await?;

        sqlx::query(
            "INSERT INTO listing_images (listing_id, image_url, is_primary, display_order) VALUES ($1, $2, TRUE, 0)",
        )
        .bind(listing_id)
        .bind(format!("https://images.example.com/listings/{listing_id}/main.jpg"))
        .execute(pool)
        .await?;
    }

    println!("Seeded listings");
    Ok(())
}
