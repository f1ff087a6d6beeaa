//! Transaction history and sales summaries.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::db::{parse_ts, SalesSummary, TransactionResponse};
use crate::engine::CheckoutService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TransactionFilter {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Accepts either a full RFC 3339 timestamp or a bare date. A bare date
/// for the end bound covers the whole day.
pub fn parse_bound(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Some(ts) = parse_ts(raw) {
        return Some(ts);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)?
    };
    Some(date.and_time(time).and_utc())
}

impl TransactionFilter {
    fn range(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ApiError> {
        let start = match &self.start_date {
            Some(raw) => Some(
                parse_bound(raw, false).ok_or_else(|| ApiError::validation("Invalid start_date"))?,
            ),
            None => None,
        };
        let end = match &self.end_date {
            Some(raw) => Some(
                parse_bound(raw, true).ok_or_else(|| ApiError::validation("Invalid end_date"))?,
            ),
            None => None,
        };
        Ok((start, end))
    }
}

/// GET /api/transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let (start, end) = filter.range()?;
    let transactions = CheckoutService::new(state.db.clone())
        .transactions_in_range(start, end)
        .await?;
    Ok(Json(
        transactions.into_iter().map(TransactionResponse::from).collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct SalesReport {
    #[serde(flatten)]
    pub summary: SalesSummary,
    pub device_sales: f64,
    pub device_hours: f64,
}

/// GET /api/transactions/summary
///
/// Every figure, the device breakdowns included, covers the same
/// filtered range.
pub async fn sales_summary(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<SalesReport>, ApiError> {
    let (start, end) = filter.range()?;
    let transactions = CheckoutService::new(state.db.clone())
        .transactions_in_range(start, end)
        .await?;

    Ok(Json(SalesReport {
        summary: CheckoutService::summarize(&transactions),
        device_sales: CheckoutService::device_sales(&transactions),
        device_hours: CheckoutService::device_hours(&transactions),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeviceTotals {
    pub device_id: Option<String>,
    pub total_sales: f64,
    pub total_hours: f64,
}

/// GET /api/transactions/device-totals
pub async fn device_totals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<DeviceTotals>, ApiError> {
    let service = CheckoutService::new(state.db.clone());
    let total_sales = service
        .total_sales_by_device(query.device_id.as_deref())
        .await?;
    let total_hours = service
        .total_hours_by_device(query.device_id.as_deref())
        .await?;

    Ok(Json(DeviceTotals {
        device_id: query.device_id,
        total_sales,
        total_hours,
    }))
}
