use anyhow::Result;
use csv::Writer;

use crate::db::{Expense, Transaction, UsageLog};

fn finish(wtr: Writer<Vec<u8>>) -> Result<Vec<u8>> {
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("csv writer flush failed: {e}"))
}

/// Transactions as CSV, one row per transaction with items flattened
/// into a readable summary column.
pub fn transactions_csv(transactions: &[Transaction]) -> Result<Vec<u8>> {
    let mut wtr = Writer::from_writer(Vec::new());

    wtr.write_record([
        "id",
        "date",
        "items",
        "total",
        "payment_method",
        "customer_name",
        "device_id",
    ])?;

    for tx in transactions {
        let items = tx
            .line_items()
            .iter()
            .map(|item| format!("{} x{}", item.name, item.quantity))
            .collect::<Vec<_>>()
            .join("; ");

        wtr.write_record(&[
            tx.id.clone(),
            tx.created_at.clone(),
            items,
            format!("{:.2}", tx.total),
            tx.payment_method.clone(),
            tx.customer_name.clone().unwrap_or_default(),
            tx.device_id.clone().unwrap_or_default(),
        ])?;
    }

    finish(wtr)
}

pub fn expenses_csv(expenses: &[Expense]) -> Result<Vec<u8>> {
    let mut wtr = Writer::from_writer(Vec::new());

    wtr.write_record(["id", "date", "description", "category", "amount", "notes"])?;

    for expense in expenses {
        wtr.write_record(&[
            expense.id.clone(),
            expense.date.clone(),
            expense.description.clone(),
            expense.category.clone(),
            format!("{:.2}", expense.amount),
            expense.notes.clone().unwrap_or_default(),
        ])?;
    }

    finish(wtr)
}

pub fn usage_logs_csv(logs: &[UsageLog]) -> Result<Vec<u8>> {
    let mut wtr = Writer::from_writer(Vec::new());

    wtr.write_record([
        "id",
        "device",
        "start_time",
        "end_time",
        "duration_minutes",
        "completed",
    ])?;

    for log in logs {
        wtr.write_record(&[
            log.id.clone(),
            log.device_name.clone(),
            log.start_time.clone(),
            log.end_time.clone(),
            log.duration_minutes.to_string(),
            if log.is_completed() { "yes" } else { "no" }.to_string(),
        ])?;
    }

    finish(wtr)
}

/// Combined income/expense ledger: one signed-amount row per entry,
/// sales positive and expenses negative, with a trailing net total.
pub fn combined_csv(transactions: &[Transaction], expenses: &[Expense]) -> Result<Vec<u8>> {
    let mut wtr = Writer::from_writer(Vec::new());

    wtr.write_record(["date", "type", "description", "amount"])?;

    let mut net = 0.0;
    for tx in transactions {
        net += tx.total;
        wtr.write_record(&[
            tx.created_at.clone(),
            "sale".to_string(),
            format!("Transaction {}", tx.id),
            format!("{:.2}", tx.total),
        ])?;
    }
    for expense in expenses {
        net -= expense.amount;
        wtr.write_record(&[
            expense.date.clone(),
            "expense".to_string(),
            expense.description.clone(),
            format!("{:.2}", -expense.amount),
        ])?;
    }

    wtr.write_record(&[
        String::new(),
        "net".to_string(),
        String::new(),
        format!("{:.2}", net),
    ])?;

    finish(wtr)
}
