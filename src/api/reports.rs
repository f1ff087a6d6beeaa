//! Report downloads in CSV and PDF form.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::transactions::parse_bound;
use crate::db::{parse_ts, Expense, Transaction, UsageLog};
use crate::engine::CheckoutService;
use crate::export::{self, PdfBuilder};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Pdf,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl ReportQuery {
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

type Download = (StatusCode, [(header::HeaderName, String); 2], Vec<u8>);

fn download(filename: &str, format: ReportFormat, bytes: Vec<u8>) -> Download {
    let (content_type, ext) = match format {
        ReportFormat::Csv => ("text/csv", "csv"),
        ReportFormat::Pdf => ("application/pdf", "pdf"),
    };
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}.{ext}\""),
            ),
        ],
        bytes,
    )
}

async fn expenses_in_range(
    state: &AppState,
    query: &ReportQuery,
) -> Result<Vec<Expense>, ApiError> {
    let all = sqlx::query_as::<_, Expense>("SELECT * FROM expenses ORDER BY date DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(all
        .into_iter()
        .filter(|e| {
            query.start_date.as_deref().map(|s| e.date.as_str() >= s).unwrap_or(true)
                && query.end_date.as_deref().map(|s| e.date.as_str() <= s).unwrap_or(true)
        })
        .collect())
}

fn transactions_pdf(transactions: &[Transaction]) -> Vec<u8> {
    let rows: Vec<Vec<String>> = transactions
        .iter()
        .map(|tx| {
            vec![
                tx.created_at.clone(),
                tx.line_items()
                    .iter()
                    .map(|l| format!("{} x{}", l.name, l.quantity))
                    .collect::<Vec<_>>()
                    .join("; "),
                tx.payment_method.clone(),
                format!("{:.2}", tx.total),
            ]
        })
        .collect();

    let mut pdf = PdfBuilder::new();
    pdf.write_table(
        "Sales Report",
        &["date", "items", "payment", "total"],
        &rows,
    );
    pdf.finish()
}

fn expenses_pdf(expenses: &[Expense]) -> Vec<u8> {
    let rows: Vec<Vec<String>> = expenses
        .iter()
        .map(|e| {
            vec![
                e.date.clone(),
                e.description.clone(),
                e.category.clone(),
                format!("{:.2}", e.amount),
            ]
        })
        .collect();

    let mut pdf = PdfBuilder::new();
    pdf.write_table(
        "Expense Report",
        &["date", "description", "category", "amount"],
        &rows,
    );
    pdf.finish()
}

fn usage_pdf(logs: &[UsageLog]) -> Vec<u8> {
    let rows: Vec<Vec<String>> = logs
        .iter()
        .map(|log| {
            vec![
                log.device_name.clone(),
                log.start_time.clone(),
                log.end_time.clone(),
                log.duration_minutes.to_string(),
                if log.is_completed() { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();

    let mut pdf = PdfBuilder::new();
    pdf.write_table(
        "Device Usage Report",
        &["device", "start", "end", "minutes", "completed"],
        &rows,
    );
    pdf.finish()
}

/// GET /api/reports/sales
pub async fn sales_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Download, ApiError> {
    let (start, end) = query.range()?;
    let transactions = CheckoutService::new(state.db.clone())
        .transactions_in_range(start, end)
        .await?;

    let bytes = match query.format {
        ReportFormat::Csv => export::csv::transactions_csv(&transactions)?,
        ReportFormat::Pdf => transactions_pdf(&transactions),
    };
    Ok(download("sales-report", query.format, bytes))
}

/// GET /api/reports/expenses
pub async fn expense_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Download, ApiError> {
    let expenses = expenses_in_range(&state, &query).await?;

    let bytes = match query.format {
        ReportFormat::Csv => export::csv::expenses_csv(&expenses)?,
        ReportFormat::Pdf => expenses_pdf(&expenses),
    };
    Ok(download("expense-report", query.format, bytes))
}

/// GET /api/reports/usage
pub async fn usage_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Download, ApiError> {
    let (start, end) = query.range()?;
    let logs: Vec<UsageLog> =
        sqlx::query_as::<_, UsageLog>("SELECT * FROM usage_logs ORDER BY end_time DESC")
            .fetch_all(&state.db)
            .await?
            .into_iter()
            // A log belongs to the range its end time falls in
            .filter(|log| match parse_ts(&log.end_time) {
                Some(ts) => {
                    start.map(|s| ts >= s).unwrap_or(true)
                        && end.map(|e| ts <= e).unwrap_or(true)
                }
                None => start.is_none() && end.is_none(),
            })
            .collect();

    let bytes = match query.format {
        ReportFormat::Csv => export::csv::usage_logs_csv(&logs)?,
        ReportFormat::Pdf => usage_pdf(&logs),
    };
    Ok(download("usage-report", query.format, bytes))
}

/// GET /api/reports/combined
///
/// Income and expenses in one ledger with a net total. CSV only; the
/// PDF form renders the two tables back to back.
pub async fn combined_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Download, ApiError> {
    let (start, end) = query.range()?;
    let transactions = CheckoutService::new(state.db.clone())
        .transactions_in_range(start, end)
        .await?;
    let expenses = expenses_in_range(&state, &query).await?;

    let bytes = match query.format {
        ReportFormat::Csv => export::csv::combined_csv(&transactions, &expenses)?,
        ReportFormat::Pdf => {
            let mut pdf = PdfBuilder::new();
            let sales_rows: Vec<Vec<String>> = transactions
                .iter()
                .map(|tx| vec![tx.created_at.clone(), format!("{:.2}", tx.total)])
                .collect();
            pdf.write_table("Sales", &["date", "total"], &sales_rows);
            let expense_rows: Vec<Vec<String>> = expenses
                .iter()
                .map(|e| {
                    vec![e.date.clone(), e.description.clone(), format!("{:.2}", e.amount)]
                })
                .collect();
            pdf.write_table("Expenses", &["date", "description", "amount"], &expense_rows);
            pdf.finish()
        }
    };
    Ok(download("combined-report", query.format, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::init_test_pool;
    use crate::AppState;

    async fn insert_usage_log(state: &AppState, id: &str, device: &str, start: &str, end: &str) {
        sqlx::query(
            r#"
            INSERT INTO usage_logs (id, device_id, device_name, start_time, end_time, duration_minutes, completed)
            VALUES (?, 'd1', ?, ?, ?, 60, 1)
            "#,
        )
        .bind(id)
        .bind(device)
        .bind(start)
        .bind(end)
        .execute(&state.db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn usage_report_honors_date_range() {
        let pool = init_test_pool().await;
        let state = Arc::new(AppState::new(Config::default(), pool, false));
        insert_usage_log(
            &state,
            "old",
            "OldBox",
            "2020-03-01T10:00:00+00:00",
            "2020-03-01T11:00:00+00:00",
        )
        .await;
        insert_usage_log(
            &state,
            "new",
            "NewBox",
            "2026-08-10T10:00:00+00:00",
            "2026-08-10T11:00:00+00:00",
        )
        .await;

        let (status, _, bytes) = usage_report(
            State(state),
            Query(ReportQuery {
                format: ReportFormat::Csv,
                start_date: Some("2026-01-01".to_string()),
                end_date: Some("2026-12-31".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::OK);
        let body = String::from_utf8(bytes).unwrap();
        assert!(body.contains("NewBox"));
        assert!(!body.contains("OldBox"));
    }
}
