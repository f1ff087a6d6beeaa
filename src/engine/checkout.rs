//! Catalog, cart, and transaction processing.
//!
//! The cart is transient and owned by the active checkout flow; nothing about
//! it is persisted. Checkout snapshots the cart into an immutable transaction
//! row, decrements stock for tracked products (floored at zero), and clears
//! the cart.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{LineItem, PaymentMethod, Product, SalesSummary, Transaction};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// The in-memory cart. Lives in `AppState` behind a mutex; one cart for the
/// single-operator deployment.
#[derive(Debug, Default, Clone)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Merge a product into the cart, adding quantities when the product
    /// is already present.
    pub fn add(&mut self, product: &Product, quantity: i64) {
        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity += quantity;
            return;
        }
        self.items.push(LineItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            category: product.category.clone(),
            quantity,
            duration_minutes: product.duration_minutes,
            device_id: product.device_id.clone(),
        });
    }

    /// Set a line's quantity; zero or less removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
    }

    /// Override a line's price and duration, for ad-hoc game-time deals.
    pub fn update_details(&mut self, product_id: &str, price: f64, duration_minutes: Option<i64>) {
        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == product_id) {
            line.price = price;
            if duration_minutes.is_some() {
                line.duration_minutes = duration_minutes;
            }
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(LineItem::subtotal).sum()
    }
}

pub struct CheckoutService {
    db: DbPool,
}

impl CheckoutService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Finalize a cart snapshot into a transaction. Decrements stock for
    /// every tracked product in the cart, never below zero.
    pub async fn process_transaction(
        &self,
        items: &[LineItem],
        payment_method: PaymentMethod,
        customer_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Transaction, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let total: f64 = items.iter().map(LineItem::subtotal).sum();
        let device_id = items.iter().find_map(|l| l.device_id.clone());

        let tx = Transaction {
            id: Uuid::new_v4().to_string(),
            items: serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string()),
            total,
            payment_method: payment_method.as_str().to_string(),
            customer_name,
            device_id,
            created_at: now.to_rfc3339(),
        };

        sqlx::query(
            r#"
            INSERT INTO transactions (id, items, total, payment_method, customer_name, device_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.items)
        .bind(tx.total)
        .bind(&tx.payment_method)
        .bind(&tx.customer_name)
        .bind(&tx.device_id)
        .bind(&tx.created_at)
        .execute(&self.db)
        .await?;

        for line in items {
            sqlx::query(
                "UPDATE products SET stock = MAX(0, stock - ?), updated_at = ? WHERE id = ? AND stock IS NOT NULL",
            )
            .bind(line.quantity)
            .bind(now.to_rfc3339())
            .bind(&line.product_id)
            .execute(&self.db)
            .await?;
        }

        tracing::info!(total = tx.total, method = %tx.payment_method, "Sale completed");

        Ok(tx)
    }

    pub async fn transactions_in_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let all = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions ORDER BY created_at DESC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(all
            .into_iter()
            .filter(|tx| {
                match crate::db::parse_ts(&tx.created_at) {
                    Some(ts) => {
                        start.map(|s| ts >= s).unwrap_or(true)
                            && end.map(|e| ts <= e).unwrap_or(true)
                    }
                    None => false,
                }
            })
            .collect())
    }

    /// Sales aggregates over a set of transactions, broken down by product
    /// category and payment method.
    pub fn summarize(transactions: &[Transaction]) -> SalesSummary {
        let mut summary = SalesSummary {
            total_transactions: transactions.len() as i64,
            ..Default::default()
        };

        for tx in transactions {
            summary.total_sales += tx.total;
            *summary
                .sales_by_payment_method
                .entry(tx.payment_method.clone())
                .or_insert(0.0) += tx.total;
            for line in tx.line_items() {
                *summary
                    .sales_by_category
                    .entry(line.category.clone())
                    .or_insert(0.0) += line.subtotal();
            }
        }

        if summary.total_transactions > 0 {
            summary.average_transaction =
                summary.total_sales / summary.total_transactions as f64;
        }
        summary
    }

    /// Revenue from device-linked sales within a set of transactions.
    pub fn device_sales(transactions: &[Transaction]) -> f64 {
        transactions
            .iter()
            .filter(|tx| tx.device_id.is_some())
            .map(|tx| tx.total)
            .sum()
    }

    /// Game-time hours sold within a set of transactions.
    pub fn device_hours(transactions: &[Transaction]) -> f64 {
        let minutes: i64 = transactions
            .iter()
            .flat_map(|tx| tx.line_items())
            .filter(|line| line.device_id.is_some())
            .filter_map(|line| line.duration_minutes.map(|d| d * line.quantity))
            .sum();
        minutes as f64 / 60.0
    }

    /// Total revenue attributed to one device, or to all device-linked
    /// sales when `device_id` is None.
    pub async fn total_sales_by_device(
        &self,
        device_id: Option<&str>,
    ) -> Result<f64, sqlx::Error> {
        let (total,): (Option<f64>,) = match device_id {
            Some(id) => {
                sqlx::query_as("SELECT SUM(total) FROM transactions WHERE device_id = ?")
                    .bind(id)
                    .fetch_one(&self.db)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT SUM(total) FROM transactions WHERE device_id IS NOT NULL")
                    .fetch_one(&self.db)
                    .await?
            }
        };
        Ok(total.unwrap_or(0.0))
    }

    /// Total game-time hours sold for one device (or all devices).
    pub async fn total_hours_by_device(
        &self,
        device_id: Option<&str>,
    ) -> Result<f64, sqlx::Error> {
        let transactions = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions")
            .fetch_all(&self.db)
            .await?;

        let minutes: i64 = transactions
            .iter()
            .flat_map(|tx| tx.line_items())
            .filter(|line| match device_id {
                Some(id) => line.device_id.as_deref() == Some(id),
                None => line.device_id.is_some(),
            })
            .filter_map(|line| line.duration_minutes.map(|d| d * line.quantity))
            .sum();

        Ok(minutes as f64 / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_pool;

    fn product(id: &str, price: f64, stock: Option<i64>) -> Product {
        let now = Utc::now().to_rfc3339();
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            price,
            category: "food".to_string(),
            description: None,
            stock,
            device_id: None,
            duration_minutes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    async fn insert_product(pool: &DbPool, p: &Product) {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, category, description, stock, device_id, duration_minutes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&p.id)
        .bind(&p.name)
        .bind(p.price)
        .bind(&p.category)
        .bind(&p.description)
        .bind(p.stock)
        .bind(&p.device_id)
        .bind(p.duration_minutes)
        .bind(&p.created_at)
        .bind(&p.updated_at)
        .execute(pool)
        .await
        .unwrap();
    }

    #[test]
    fn cart_merges_repeat_products() {
        let mut cart = Cart::default();
        let p = product("p1", 2.5, None);
        cart.add(&p, 1);
        cart.add(&p, 2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.total(), 7.5);
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::default();
        cart.add(&product("p1", 2.5, None), 2);
        cart.update_quantity("p1", 0);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn empty_cart_checkout_changes_nothing() {
        let pool = init_test_pool().await;
        insert_product(&pool, &product("p1", 5.0, Some(10))).await;
        let svc = CheckoutService::new(pool.clone());

        let result = svc
            .process_transaction(&[], PaymentMethod::Cash, None, Utc::now())
            .await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));

        let (tx_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(tx_count, 0);
        let (stock,): (i64,) = sqlx::query_as("SELECT stock FROM products WHERE id = 'p1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 10);
    }

    #[tokio::test]
    async fn checkout_snapshots_cart_and_decrements_stock() {
        let pool = init_test_pool().await;
        insert_product(&pool, &product("p1", 2.5, Some(50))).await;
        insert_product(&pool, &product("p2", 10.0, None)).await;
        let svc = CheckoutService::new(pool.clone());

        let mut cart = Cart::default();
        cart.add(&product("p1", 2.5, Some(50)), 4);
        cart.add(&product("p2", 10.0, None), 1);

        let tx = svc
            .process_transaction(
                cart.items(),
                PaymentMethod::Card,
                Some("Ada".to_string()),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(tx.total, 20.0);
        assert_eq!(tx.line_items().len(), 2);
        assert_eq!(tx.customer_name.as_deref(), Some("Ada"));

        let (stock,): (i64,) = sqlx::query_as("SELECT stock FROM products WHERE id = 'p1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 46);

        // Untracked product keeps NULL stock
        let (stock,): (Option<i64>,) =
            sqlx::query_as("SELECT stock FROM products WHERE id = 'p2'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stock, None);
    }

    #[tokio::test]
    async fn stock_clamps_at_zero_when_overselling() {
        let pool = init_test_pool().await;
        insert_product(&pool, &product("p1", 2.5, Some(2))).await;
        let svc = CheckoutService::new(pool.clone());

        let mut cart = Cart::default();
        cart.add(&product("p1", 2.5, Some(2)), 3);

        svc.process_transaction(cart.items(), PaymentMethod::Cash, None, Utc::now())
            .await
            .unwrap();

        let (stock,): (i64,) = sqlx::query_as("SELECT stock FROM products WHERE id = 'p1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 0);
    }

    #[tokio::test]
    async fn summary_breaks_down_by_category_and_method() {
        let pool = init_test_pool().await;
        let svc = CheckoutService::new(pool.clone());

        let mut gametime = product("p1", 10.0, None);
        gametime.category = "gameTime".to_string();
        gametime.duration_minutes = Some(60);
        gametime.device_id = Some("d1".to_string());
        let snack = product("p2", 2.0, Some(10));

        let mut cart = Cart::default();
        cart.add(&gametime, 2);
        svc.process_transaction(cart.items(), PaymentMethod::Cash, None, Utc::now())
            .await
            .unwrap();

        let mut cart = Cart::default();
        cart.add(&snack, 3);
        svc.process_transaction(cart.items(), PaymentMethod::Card, None, Utc::now())
            .await
            .unwrap();

        let txs = svc.transactions_in_range(None, None).await.unwrap();
        let summary = CheckoutService::summarize(&txs);
        assert_eq!(summary.total_transactions, 2);
        assert_eq!(summary.total_sales, 26.0);
        assert_eq!(summary.average_transaction, 13.0);
        assert_eq!(summary.sales_by_category["gameTime"], 20.0);
        assert_eq!(summary.sales_by_category["food"], 6.0);
        assert_eq!(summary.sales_by_payment_method["cash"], 20.0);
        assert_eq!(summary.sales_by_payment_method["card"], 6.0);

        assert_eq!(svc.total_sales_by_device(Some("d1")).await.unwrap(), 20.0);
        assert_eq!(svc.total_hours_by_device(Some("d1")).await.unwrap(), 2.0);
    }

    #[tokio::test]
    async fn device_figures_follow_the_filtered_range() {
        let pool = init_test_pool().await;
        let svc = CheckoutService::new(pool.clone());
        let t0 = Utc::now();

        let mut gametime = product("p1", 10.0, None);
        gametime.category = "gameTime".to_string();
        gametime.duration_minutes = Some(60);
        gametime.device_id = Some("d1".to_string());

        // One device sale last month, one today
        let mut cart = Cart::default();
        cart.add(&gametime, 1);
        svc.process_transaction(
            cart.items(),
            PaymentMethod::Cash,
            None,
            t0 - chrono::Duration::days(30),
        )
        .await
        .unwrap();
        svc.process_transaction(cart.items(), PaymentMethod::Cash, None, t0)
            .await
            .unwrap();

        let recent = svc
            .transactions_in_range(Some(t0 - chrono::Duration::days(1)), None)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(CheckoutService::device_sales(&recent), 10.0);
        assert_eq!(CheckoutService::device_hours(&recent), 1.0);

        let all = svc.transactions_in_range(None, None).await.unwrap();
        assert_eq!(CheckoutService::device_sales(&all), 20.0);
        assert_eq!(CheckoutService::device_hours(&all), 2.0);
    }
}
