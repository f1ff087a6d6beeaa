//! Product catalog endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::db::{now_ts, CreateProductRequest, Product, UpdateProductRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /api/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = match filter.category {
        Some(category) => {
            sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE category = ? ORDER BY name",
            )
            .bind(category)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name")
                .fetch_all(&state.db)
                .await?
        }
    };
    Ok(Json(products))
}

/// GET /api/products/:id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Json(product))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation("Product name is required"));
    }
    if req.price < 0.0 {
        return Err(ApiError::validation("Price cannot be negative"));
    }

    let now = now_ts();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        price: req.price,
        category: req.category.as_str().to_string(),
        description: req.description,
        stock: req.stock,
        device_id: req.device_id,
        duration_minutes: req.duration_minutes,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO products (id, name, price, category, description, stock, device_id, duration_minutes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.price)
    .bind(&product.category)
    .bind(&product.description)
    .bind(product.stock)
    .bind(&product.device_id)
    .bind(product.duration_minutes)
    .bind(&product.created_at)
    .bind(&product.updated_at)
    .execute(&state.db)
    .await?;

    info!(name = %product.name, "Product created");

    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/:id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let mut product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("Product name is required"));
        }
        product.name = name.trim().to_string();
    }
    if let Some(price) = req.price {
        if price < 0.0 {
            return Err(ApiError::validation("Price cannot be negative"));
        }
        product.price = price;
    }
    if let Some(category) = req.category {
        product.category = category.as_str().to_string();
    }
    if let Some(description) = req.description {
        product.description = Some(description);
    }
    if let Some(stock) = req.stock {
        product.stock = Some(stock.max(0));
    }
    if let Some(device_id) = req.device_id {
        product.device_id = Some(device_id);
    }
    if let Some(duration) = req.duration_minutes {
        product.duration_minutes = Some(duration);
    }
    product.updated_at = now_ts();

    sqlx::query(
        r#"
        UPDATE products
        SET name = ?, price = ?, category = ?, description = ?, stock = ?,
            device_id = ?, duration_minutes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&product.name)
    .bind(product.price)
    .bind(&product.category)
    .bind(&product.description)
    .bind(product.stock)
    .bind(&product.device_id)
    .bind(product.duration_minutes)
    .bind(&product.updated_at)
    .bind(&product.id)
    .execute(&state.db)
    .await?;

    Ok(Json(product))
}

/// DELETE /api/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Product not found"));
    }

    // Drop the product from the cart too; a stale line would sell a
    // product that no longer exists.
    state.cart.lock().remove(&id);

    info!(id = %id, "Product deleted");

    Ok(StatusCode::NO_CONTENT)
}
