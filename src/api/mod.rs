mod alerts;
mod cart;
mod devices;
pub mod error;
mod expenses;
pub mod guard;
mod products;
mod reports;
mod sessions;
mod transactions;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub use error::{ApiError, ErrorCode};

pub fn create_router(state: Arc<AppState>) -> Router {
    // Guard routes stay reachable while the screen is locked
    let guard_routes = Router::new()
        .route("/status", get(guard::status))
        .route("/unlock", post(guard::unlock))
        .route("/lock", post(guard::lock))
        .route("/pin", put(guard::set_pin));

    let api_routes = Router::new()
        // Devices
        .route("/devices", get(devices::list_devices))
        .route("/devices", post(devices::create_device))
        .route("/devices/:id", get(devices::get_device))
        .route("/devices/:id", put(devices::update_device))
        .route("/devices/:id", delete(devices::delete_device))
        // Sessions
        .route("/sessions", get(sessions::list_sessions))
        .route("/devices/:id/session", get(sessions::get_session))
        .route("/devices/:id/session", post(sessions::start_session))
        .route("/devices/:id/session", delete(sessions::stop_session))
        .route("/devices/:id/session/pause", post(sessions::pause_session))
        .route("/devices/:id/session/resume", post(sessions::resume_session))
        .route("/devices/:id/session/extend", post(sessions::extend_session))
        .route("/usage-logs", get(sessions::list_usage_logs))
        // Products
        .route("/products", get(products::list_products))
        .route("/products", post(products::create_product))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id", put(products::update_product))
        .route("/products/:id", delete(products::delete_product))
        // Cart
        .route("/cart", get(cart::get_cart))
        .route("/cart", delete(cart::clear_cart))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:product_id", put(cart::update_item))
        .route("/cart/items/:product_id", delete(cart::remove_item))
        .route("/cart/checkout", post(cart::checkout))
        // Transactions
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/summary", get(transactions::sales_summary))
        .route(
            "/transactions/device-totals",
            get(transactions::device_totals),
        )
        // Expenses
        .route("/expenses", get(expenses::list_expenses))
        .route("/expenses", post(expenses::create_expense))
        .route("/expenses/summary", get(expenses::expense_summary))
        .route("/expenses/categories", get(expenses::list_categories))
        .route("/expenses/:id", put(expenses::update_expense))
        .route("/expenses/:id", delete(expenses::delete_expense))
        // Reports
        .route("/reports/sales", get(reports::sales_report))
        .route("/reports/expenses", get(reports::expense_report))
        .route("/reports/usage", get(reports::usage_report))
        .route("/reports/combined", get(reports::combined_report))
        // Alerts
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/:id/ack", post(alerts::acknowledge_alert))
        // Everything above answers 423 while the screen is locked
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::guard_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/guard", guard_routes)
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::init_test_pool;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    async fn test_state(pin_set: bool) -> Arc<AppState> {
        let pool = init_test_pool().await;
        Arc::new(AppState::new(Config::default(), pool, pin_set))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn insert_device(state: &AppState, id: &str) {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO devices (id, name, category, status, default_minutes, created_at, updated_at) \
             VALUES (?, ?, 'console', 'available', 60, ?, ?)",
        )
        .bind(id)
        .bind(format!("Device {id}"))
        .bind(&now)
        .bind(&now)
        .execute(&state.db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn locked_screen_answers_423_outside_guard_routes() {
        let state = test_state(true).await;
        assert!(state.guard.is_locked());
        let app = create_router(state);

        let resp = app.clone().oneshot(get("/api/devices")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::LOCKED);
        let resp = app
            .clone()
            .oneshot(post("/api/devices/d1/session/pause"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::LOCKED);

        // The lock screen itself stays reachable
        let resp = app.clone().oneshot(get("/api/guard/status")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn requests_stamp_operator_activity() {
        let state = test_state(true).await;
        let app = create_router(state.clone());

        // Unlock with a stale activity stamp
        state.guard.unlock(Utc::now() - Duration::minutes(60));
        let timeout = Duration::minutes(10);
        assert!(state.guard.idle_expired(Utc::now(), timeout));

        let resp = app.oneshot(get("/api/devices")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!state.guard.idle_expired(Utc::now(), timeout));
    }

    #[tokio::test]
    async fn timer_controls_never_error_on_noops() {
        let state = test_state(false).await;
        let app = create_router(state.clone());

        // No session anywhere: each control answers 204, not 404
        let resp = app
            .clone()
            .oneshot(post("/api/devices/ghost/session/pause"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = app
            .clone()
            .oneshot(post("/api/devices/ghost/session/resume"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = app
            .clone()
            .oneshot(json_post(
                "/api/devices/ghost/session/extend",
                r#"{"additional_minutes":5}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/devices/ghost/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        // Pausing twice settles at the paused session, no error
        insert_device(&state, "d1").await;
        let resp = app
            .clone()
            .oneshot(json_post("/api/devices/d1/session", "{}"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .clone()
            .oneshot(post("/api/devices/d1/session/pause"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(post("/api/devices/d1/session/pause"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("\"is_paused\":true"));
    }
}
