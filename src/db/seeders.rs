//! Database seeders for starter data.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use super::models::common::now_ts;

/// Seed sample products into an empty catalog so a fresh install has
/// something to sell. Never touches a catalog that already has rows.
pub async fn seed_sample_products(pool: &SqlitePool) -> Result<()> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    if count.0 > 0 {
        return Ok(());
    }

    info!("Seeding sample products into empty catalog...");

    // (id, name, price, category, description, stock, duration_minutes)
    let samples: Vec<(&str, &str, f64, &str, &str, Option<i64>, Option<i64>)> = vec![
        (
            "p1",
            "1 Hour Game Time",
            10.0,
            "gameTime",
            "1 hour of gameplay on any available device",
            None,
            Some(60),
        ),
        (
            "p2",
            "2 Hour Game Time",
            18.0,
            "gameTime",
            "2 hours of gameplay on any available device",
            None,
            Some(120),
        ),
        (
            "p3",
            "Gaming T-Shirt",
            24.99,
            "merchandise",
            "Cool gaming-themed t-shirt",
            Some(15),
            None,
        ),
        ("p4", "Soda", 2.50, "drink", "Refreshing beverage", Some(50), None),
        ("p5", "Chips", 1.99, "food", "Tasty snack", Some(30), None),
    ];

    let now = now_ts();
    for (id, name, price, category, description, stock, duration) in samples {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, category, description, stock, duration_minutes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(price)
        .bind(category)
        .bind(description)
        .bind(stock)
        .bind(duration)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_pool;

    #[tokio::test]
    async fn seeds_once_and_only_once() {
        let pool = init_test_pool().await;

        seed_sample_products(&pool).await.unwrap();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 5);

        // Second run must not duplicate
        seed_sample_products(&pool).await.unwrap();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 5);
    }
}
