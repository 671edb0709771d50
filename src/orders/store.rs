// Order store
//
// Typed, parameterized operations on the orders table. Lifecycle guards
// live in the WHERE clauses so a row can only move NO -> YES -> RETURNED.

use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::eligibility::{check_return, ReturnDecision, RETURN_WINDOW_DAYS};
use super::model::{DeliveryStatus, NewOrder, OrderSummary, PendingOrder};
use crate::db::{is_valid_identifier, Database, Dialect, SqlValue};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("No order found for customer {0}")]
    NotFound(String),

    #[error("Invalid order: {0}")]
    InvalidInput(String),

    #[error("No undelivered order for customer {0}; delivered orders cannot be changed")]
    NotUpdatable(String),

    #[error("Return denied for customer {customer_id}: {decision}")]
    ReturnDenied {
        customer_id: String,
        decision: ReturnDecision,
    },

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

pub type OrderResult<T> = std::result::Result<T, OrderError>;

pub struct OrderStore {
    db: Arc<dyn Database>,
    table: String,
    window_days: i64,
}

impl OrderStore {
    pub fn new(db: Arc<dyn Database>, table: impl Into<String>) -> OrderResult<Self> {
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(OrderError::InvalidInput(format!("invalid table name '{}'", table)));
        }
        Ok(Self {
            db,
            table,
            window_days: RETURN_WINDOW_DAYS,
        })
    }

    pub fn with_return_window(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn return_window_days(&self) -> i64 {
        self.window_days
    }

    /// Create the orders table when it does not exist yet.
    pub async fn ensure_schema(&self) -> OrderResult<()> {
        let ddl = match self.db.dialect() {
            Dialect::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS `{}` (
                    Customer_Name TEXT NOT NULL,
                    Customer_ID TEXT NOT NULL,
                    Segment TEXT,
                    Country TEXT,
                    State TEXT,
                    Postal_Code TEXT,
                    Region TEXT,
                    Category TEXT,
                    Product_Name TEXT NOT NULL,
                    Quantity INTEGER NOT NULL CHECK (Quantity >= 1),
                    Purchase_Date TEXT NOT NULL,
                    Delivered TEXT NOT NULL DEFAULT 'NO'
                        CHECK (Delivered IN ('NO', 'YES', 'RETURNED'))
                )",
                self.table
            ),
            Dialect::MySql => format!(
                "CREATE TABLE IF NOT EXISTS `{}` (
                    Customer_Name VARCHAR(255) NOT NULL,
                    Customer_ID VARCHAR(64) NOT NULL,
                    Segment VARCHAR(64),
                    Country VARCHAR(128),
                    State VARCHAR(128),
                    Postal_Code VARCHAR(32),
                    Region VARCHAR(32),
                    Category VARCHAR(64),
                    Product_Name VARCHAR(255) NOT NULL,
                    Quantity INT NOT NULL,
                    Purchase_Date DATE NOT NULL,
                    Delivered VARCHAR(16) NOT NULL DEFAULT 'NO',
                    INDEX idx_customer (Customer_ID)
                )",
                self.table
            ),
        };
        self.db.execute(&ddl, &[]).await?;
        info!("Orders table `{}` ready", self.table);
        Ok(())
    }

    /// Insert a new order dated `today` with status NO.
    #[instrument(skip(self, order), fields(customer = %order.customer_id))]
    pub async fn insert_order(&self, order: &NewOrder, today: NaiveDate) -> OrderResult<()> {
        let problems = order.problems();
        if !problems.is_empty() {
            return Err(OrderError::InvalidInput(problems.join("; ")));
        }

        let sql = format!(
            "INSERT INTO `{}` \
             (Customer_Name, Customer_ID, Segment, Country, State, Postal_Code, Region, Category, \
              Product_Name, Quantity, Purchase_Date, Delivered) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table
        );
        let params: Vec<SqlValue> = vec![
            order.customer_name.trim().into(),
            order.customer_id.trim().into(),
            order.segment.as_str().into(),
            order.country.as_str().into(),
            order.state.as_str().into(),
            order.postal_code.as_str().into(),
            order.region.as_str().into(),
            order.category.as_str().into(),
            order.product_name.trim().into(),
            order.quantity.into(),
            today.into(),
            DeliveryStatus::No.as_str().into(),
        ];
        self.db.execute(&sql, &params).await?;
        info!("Order placed");
        Ok(())
    }

    pub async fn undelivered_orders(&self) -> OrderResult<Vec<PendingOrder>> {
        let sql = format!(
            "SELECT Customer_ID, Customer_Name, Product_Name, Quantity FROM `{}` \
             WHERE Delivered = 'NO'",
            self.table
        );
        let out = self.db.query(&sql, &[]).await?;
        Ok(PendingOrder::from_rows(&out)?)
    }

    pub async fn all_orders(&self) -> OrderResult<Vec<OrderSummary>> {
        let sql = format!(
            "SELECT Customer_ID, Customer_Name, Product_Name, Purchase_Date, Delivered FROM `{}`",
            self.table
        );
        let out = self.db.query(&sql, &[]).await?;
        Ok(OrderSummary::from_rows(&out)?)
    }

    /// Most recent order for `customer_id`. Same-day orders are ordered by
    /// product name so the pick is stable.
    pub async fn find_order(&self, customer_id: &str) -> OrderResult<OrderSummary> {
        self.first_order(customer_id, "Purchase_Date DESC, Product_Name").await
    }

    /// The order a return request applies to: the newest delivered order,
    /// else the newest returned one, else the newest undelivered one.
    pub async fn return_candidate(&self, customer_id: &str) -> OrderResult<OrderSummary> {
        self.first_order(
            customer_id,
            "CASE Delivered WHEN 'YES' THEN 0 WHEN 'RETURNED' THEN 1 ELSE 2 END, \
             Purchase_Date DESC, Product_Name",
        )
        .await
    }

    async fn first_order(&self, customer_id: &str, order_by: &str) -> OrderResult<OrderSummary> {
        let sql = format!(
            "SELECT Customer_ID, Customer_Name, Product_Name, Purchase_Date, Delivered FROM `{}` \
             WHERE Customer_ID = ? ORDER BY {} LIMIT 1",
            self.table, order_by
        );
        let out = self.db.query(&sql, &[customer_id.trim().into()]).await?;
        OrderSummary::from_rows(&out)?
            .into_iter()
            .next()
            .ok_or_else(|| OrderError::NotFound(customer_id.to_string()))
    }

    /// Change product and quantity of the customer's undelivered order.
    #[instrument(skip(self))]
    pub async fn update_order(
        &self,
        customer_id: &str,
        product_name: &str,
        quantity: i64,
    ) -> OrderResult<u64> {
        if product_name.trim().is_empty() {
            return Err(OrderError::InvalidInput("product name is required".to_string()));
        }
        if quantity < 1 {
            return Err(OrderError::InvalidInput(format!(
                "quantity must be at least 1 (got {})",
                quantity
            )));
        }

        let sql = format!(
            "UPDATE `{}` SET Product_Name = ?, Quantity = ? \
             WHERE Customer_ID = ? AND Delivered = 'NO'",
            self.table
        );
        let affected = self
            .db
            .execute(
                &sql,
                &[
                    product_name.trim().into(),
                    quantity.into(),
                    customer_id.trim().into(),
                ],
            )
            .await?;
        if affected == 0 {
            return Err(OrderError::NotUpdatable(customer_id.to_string()));
        }
        info!("Updated {} order(s)", affected);
        Ok(affected)
    }

    /// NO -> YES
    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, customer_id: &str) -> OrderResult<u64> {
        let sql = format!(
            "UPDATE `{}` SET Delivered = 'YES' WHERE Customer_ID = ? AND Delivered = 'NO'",
            self.table
        );
        let affected = self.db.execute(&sql, &[customer_id.trim().into()]).await?;
        if affected == 0 {
            return Err(OrderError::NotUpdatable(customer_id.to_string()));
        }
        info!("Marked {} order(s) delivered", affected);
        Ok(affected)
    }

    /// Cancel the customer's undelivered orders. Delivered and returned
    /// orders are kept.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, customer_id: &str) -> OrderResult<u64> {
        let sql = format!(
            "DELETE FROM `{}` WHERE Customer_ID = ? AND Delivered = 'NO'",
            self.table
        );
        let affected = self.db.execute(&sql, &[customer_id.trim().into()]).await?;
        if affected == 0 {
            return Err(OrderError::NotUpdatable(customer_id.to_string()));
        }
        info!("Cancelled {} order(s)", affected);
        Ok(affected)
    }

    pub async fn return_eligibility(
        &self,
        customer_id: &str,
        today: NaiveDate,
    ) -> OrderResult<(OrderSummary, ReturnDecision)> {
        let order = self.return_candidate(customer_id).await?;
        let decision = check_return(order.status, order.purchase_date, today, self.window_days);
        debug!("Return eligibility for {}: {:?}", customer_id, decision);
        Ok((order, decision))
    }

    /// YES -> RETURNED for the order `return_eligibility` picks, only inside
    /// the return window.
    #[instrument(skip(self))]
    pub async fn mark_returned(&self, customer_id: &str, today: NaiveDate) -> OrderResult<u64> {
        let (order, decision) = self.return_eligibility(customer_id, today).await?;
        if !decision.is_eligible() {
            return Err(OrderError::ReturnDenied {
                customer_id: customer_id.to_string(),
                decision,
            });
        }

        let earliest = today - chrono::Duration::days(self.window_days);
        let sql = format!(
            "UPDATE `{}` SET Delivered = 'RETURNED' \
             WHERE Customer_ID = ? AND Product_Name = ? AND Delivered = 'YES' \
             AND Purchase_Date >= ?",
            self.table
        );
        let params: Vec<SqlValue> = vec![
            customer_id.trim().into(),
            order.product_name.as_str().into(),
            earliest.into(),
        ];
        let affected = self.db.execute(&sql, &params).await?;
        if affected == 0 {
            return Err(OrderError::NotUpdatable(customer_id.to_string()));
        }
        info!("Processed return for {} order(s)", affected);
        Ok(affected)
    }
}
