use rust_decimal_macros::dec;
use storefront_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "Store Admin", "admin@example.com", "admin").await?;
    let customer_id = ensure_user(&pool, "Jane Doe", "customer@example.com", "customer").await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

// Password hashes are produced by the external auth system; seeds carry an
// inert placeholder.
async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind("!seeded")
    .bind(role)
    .fetch_optional(pool)
    .await?;

    row.map(|(id,)| id)
        .ok_or_else(|| anyhow::anyhow!("seeding user {email} returned no id"))
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let category_id = Uuid::new_v4();
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, slug)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(category_id)
    .bind("Apparel")
    .bind("apparel")
    .fetch_optional(pool)
    .await?;
    let category_id = row
        .map(|(id,)| id)
        .ok_or_else(|| anyhow::anyhow!("seeding category returned no id"))?;

    let products = [
        ("classic-tee", "Classic Tee", dec!(19.99), 120),
        ("hooded-sweatshirt", "Hooded Sweatshirt", dec!(49.50), 40),
        ("canvas-cap", "Canvas Cap", dec!(14.25), 75),
    ];

    for (slug, name, price, stock) in products {
        let product_id = Uuid::now_v7();
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, slug, name, description, price, stock, rating, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (slug) DO UPDATE SET price = EXCLUDED.price, stock = EXCLUDED.stock
            RETURNING id
            "#,
        )
        .bind(product_id)
        .bind(slug)
        .bind(name)
        .bind(format!("{name} from the demo catalog"))
        .bind(price)
        .bind(stock)
        .bind(dec!(4.0))
        .bind(category_id)
        .fetch_optional(pool)
        .await?;

        if let Some((id,)) = row {
            sqlx::query(
                r#"
                INSERT INTO product_images (id, product_id, image)
                SELECT $1, $2, $3
                WHERE NOT EXISTS (
                    SELECT 1 FROM product_images WHERE product_id = $2 AND image = $3
                )
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(format!("/images/{slug}.jpg"))
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}
