//! Cart endpoints and checkout.
//!
//! The cart is transient, in-memory state on `AppState`; checkout snapshots
//! it into a transaction and clears it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::db::{CheckoutRequest, LineItem, Product, TransactionResponse};
use crate::engine::CheckoutService;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub total: f64,
}

fn view(state: &AppState) -> CartView {
    let cart = state.cart.lock();
    CartView {
        items: cart.items().to_vec(),
        total: cart.total(),
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

/// GET /api/cart
pub async fn get_cart(State(state): State<Arc<AppState>>) -> Json<CartView> {
    Json(view(&state))
}

/// POST /api/cart/items
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    if req.quantity <= 0 {
        return Err(ApiError::validation("Quantity must be positive"));
    }

    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(&req.product_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    state.cart.lock().add(&product, req.quantity);

    Ok(Json(view(&state)))
}

/// PUT /api/cart/items/:product_id
///
/// Adjusts quantity or overrides price and game-time duration for one
/// line. Quantity zero removes the line.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    {
        let mut cart = state.cart.lock();
        if !cart.items().iter().any(|l| l.product_id == product_id) {
            return Err(ApiError::not_found("Item is not in the cart"));
        }
        if let Some(quantity) = req.quantity {
            cart.update_quantity(&product_id, quantity);
        }
        if let Some(price) = req.price {
            if price < 0.0 {
                return Err(ApiError::validation("Price cannot be negative"));
            }
            cart.update_details(&product_id, price, req.duration_minutes);
        }
    }

    Ok(Json(view(&state)))
}

/// DELETE /api/cart/items/:product_id
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Json<CartView> {
    state.cart.lock().remove(&product_id);
    Json(view(&state))
}

/// DELETE /api/cart
pub async fn clear_cart(State(state): State<Arc<AppState>>) -> Json<CartView> {
    state.cart.lock().clear();
    Json(view(&state))
}

/// POST /api/cart/checkout
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    // Snapshot under the lock, run the sale outside it
    let items: Vec<LineItem> = state.cart.lock().items().to_vec();

    let tx = CheckoutService::new(state.db.clone())
        .process_transaction(&items, req.payment_method, req.customer_name, Utc::now())
        .await?;

    state.cart.lock().clear();

    Ok((StatusCode::CREATED, Json(TransactionResponse::from(tx))))
}
