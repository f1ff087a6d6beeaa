//! Sales transaction models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Mobile,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cart line, snapshotted into the transaction at sale time so later
/// product edits never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// Immutable sale record. `items` holds the JSON line-item snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: String,
    pub items: String,
    pub total: f64,
    pub payment_method: String,
    pub customer_name: Option<String>,
    pub device_id: Option<String>,
    pub created_at: String,
}

impl Transaction {
    pub fn line_items(&self) -> Vec<LineItem> {
        serde_json::from_str(&self.items).unwrap_or_default()
    }
}

/// Response DTO with line items decoded
#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub items: Vec<LineItem>,
    pub total: f64,
    pub payment_method: String,
    pub customer_name: Option<String>,
    pub device_id: Option<String>,
    pub created_at: String,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        let items = tx.line_items();
        Self {
            id: tx.id,
            items,
            total: tx.total,
            payment_method: tx.payment_method,
            customer_name: tx.customer_name,
            device_id: tx.device_id,
            created_at: tx.created_at,
        }
    }
}

/// Request to finalize the cart into a transaction
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub customer_name: Option<String>,
}

/// Sales summary aggregates for the reports page
#[derive(Debug, Clone, Serialize, Default)]
pub struct SalesSummary {
    pub total_sales: f64,
    pub total_transactions: i64,
    pub average_transaction: f64,
    pub sales_by_category: std::collections::HashMap<String, f64>,
    pub sales_by_payment_method: std::collections::HashMap<String, f64>,
}
