//! Expense tracking models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Suggested expense categories shown by the UI. The field itself is
/// free-form; anything outside this list is still accepted.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Food",
    "Supplies",
    "Equipment",
    "Maintenance",
    "Utilities",
    "Rent",
    "Salaries",
    "Marketing",
    "Other",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request to create an expense
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to update an expense
#[derive(Debug, Deserialize)]
pub struct UpdateExpenseRequest {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub notes: Option<String>,
}

/// Filter query for listing expenses
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
}

/// Totals for the expense summary card
#[derive(Debug, Clone, Serialize, Default)]
pub struct ExpenseSummary {
    pub total: f64,
    pub count: i64,
    pub by_category: std::collections::HashMap<String, f64>,
}
