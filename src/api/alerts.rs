//! Alert feed endpoints. Clients poll these to surface expiry and lock
//! notifications.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::transactions::parse_bound;
use crate::db::{parse_ts, Alert, AlertQuery, AlertResponse};
use crate::AppState;

/// GET /api/alerts
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<Vec<AlertResponse>>, ApiError> {
    let since = match query.since.as_deref() {
        Some(raw) => {
            Some(parse_bound(raw, false).ok_or_else(|| ApiError::validation("Invalid since"))?)
        }
        None => None,
    };

    let sql = if query.include_acknowledged {
        "SELECT * FROM alerts ORDER BY created_at DESC"
    } else {
        "SELECT * FROM alerts WHERE acknowledged = 0 ORDER BY created_at DESC"
    };
    let alerts = sqlx::query_as::<_, Alert>(sql).fetch_all(&state.db).await?;

    // The cap counts only rows that survive the filters. Timestamps are
    // compared parsed; RFC 3339 strings with mixed fractional precision
    // do not sort reliably.
    Ok(Json(
        alerts
            .into_iter()
            .filter(|a| match since {
                Some(cutoff) => parse_ts(&a.created_at).map(|ts| ts >= cutoff).unwrap_or(false),
                None => true,
            })
            .take(200)
            .map(AlertResponse::from)
            .collect(),
    ))
}

/// POST /api/alerts/:id/ack
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AlertResponse>, ApiError> {
    let result = sqlx::query("UPDATE alerts SET acknowledged = 1 WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Alert not found"));
    }

    let alert = sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(AlertResponse::from(alert)))
}
