// Order tools - the only way the orders profile changes orders
//
// Raw SQL against the orders table is read-only for the agent. Placing,
// updating, delivering, cancelling and returning go through OrderStore, so
// the NO -> YES -> RETURNED guards and the return window hold whatever the
// model asks for.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::orders::{NewOrder, OrderError, OrderStore};
use crate::tools::registry::Tool;
use crate::tools::types::ToolInputSchema;

fn customer_id(input: &Value) -> Result<&str> {
    input["customer_id"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .context("Missing customer_id parameter")
}

fn today(fixed: Option<NaiveDate>) -> NaiveDate {
    fixed.unwrap_or_else(|| Local::now().date_naive())
}

fn text(input: &Value, key: &str) -> String {
    input[key].as_str().map(str::trim).unwrap_or_default().to_string()
}

/// Models send quantities both as numbers and as strings.
fn quantity(input: &Value) -> Result<i64> {
    match &input["quantity"] {
        Value::Number(n) => n.as_i64().context("quantity must be a whole number"),
        Value::String(s) => s
            .trim()
            .parse()
            .with_context(|| format!("quantity '{}' is not a whole number", s)),
        _ => bail!("Missing quantity parameter"),
    }
}

fn schema(properties: Value, required: &[&str]) -> ToolInputSchema {
    ToolInputSchema {
        schema_type: "object".to_string(),
        properties,
        required: required.iter().map(|r| r.to_string()).collect(),
    }
}

/// A lifecycle refusal is an answer for the user, not a tool failure.
fn refusal(result: std::result::Result<u64, OrderError>, done: String) -> Result<String> {
    match result {
        Ok(_) => Ok(done),
        Err(e @ OrderError::NotUpdatable(_)) => Ok(format!("Not changed: {}.", e)),
        Err(e) => Err(e.into()),
    }
}

pub struct PlaceOrderTool {
    store: Arc<OrderStore>,
    today: Option<NaiveDate>,
}

impl PlaceOrderTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store, today: None }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

#[async_trait]
impl Tool for PlaceOrderTool {
    fn name(&self) -> &str {
        "order_place"
    }

    fn description(&self) -> &str {
        "Place a new order. Purchase_Date is set to today and Delivered to 'NO'. \
         Segment must be Consumer, Corporate or Home Office; Region must be East, West, \
         Central or South."
    }

    fn input_schema(&self) -> ToolInputSchema {
        let field = |description: &str| json!({"type": "string", "description": description});
        schema(
            json!({
                "customer_name": field("Customer_Name"),
                "customer_id": field("Customer_ID"),
                "segment": field("Segment"),
                "country": field("Country"),
                "state": field("State"),
                "postal_code": field("Postal_Code"),
                "region": field("Region"),
                "category": field("Category"),
                "product_name": field("Product_Name"),
                "quantity": {"type": "integer", "description": "Quantity, at least 1"}
            }),
            &["customer_name", "customer_id", "product_name", "quantity"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let order = NewOrder {
            customer_name: text(&input, "customer_name"),
            customer_id: text(&input, "customer_id"),
            segment: text(&input, "segment"),
            country: text(&input, "country"),
            state: text(&input, "state"),
            postal_code: text(&input, "postal_code"),
            region: text(&input, "region"),
            category: text(&input, "category"),
            product_name: text(&input, "product_name"),
            quantity: quantity(&input)?,
        };
        let date = today(self.today);
        self.store.insert_order(&order, date).await?;
        Ok(format!(
            "Order placed for customer {} ({}): {} x {}, purchased {}, Delivered = NO.",
            order.customer_id, order.customer_name, order.quantity, order.product_name, date
        ))
    }
}

pub struct UpdateOrderTool {
    store: Arc<OrderStore>,
}

impl UpdateOrderTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateOrderTool {
    fn name(&self) -> &str {
        "order_update"
    }

    fn description(&self) -> &str {
        "Change the product and quantity of a customer's order. Only orders that have not \
         been delivered (Delivered = 'NO') can be changed."
    }

    fn input_schema(&self) -> ToolInputSchema {
        schema(
            json!({
                "customer_id": {"type": "string", "description": "The Customer_ID of the order"},
                "product_name": {"type": "string", "description": "New Product_Name"},
                "quantity": {"type": "integer", "description": "New quantity, at least 1"}
            }),
            &["customer_id", "product_name", "quantity"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let id = customer_id(&input)?;
        let product = text(&input, "product_name");
        let qty = quantity(&input)?;
        refusal(
            self.store.update_order(id, &product, qty).await,
            format!("The order for customer {} now has {} x {}.", id, qty, product),
        )
    }
}

pub struct MarkDeliveredTool {
    store: Arc<OrderStore>,
}

impl MarkDeliveredTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MarkDeliveredTool {
    fn name(&self) -> &str {
        "order_mark_delivered"
    }

    fn description(&self) -> &str {
        "Mark a customer's undelivered order as delivered (Delivered 'NO' -> 'YES')."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::simple(vec![("customer_id", "The Customer_ID of the order")])
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let id = customer_id(&input)?;
        refusal(
            self.store.mark_delivered(id).await,
            format!("The order for customer {} is now marked delivered.", id),
        )
    }
}

pub struct CancelOrderTool {
    store: Arc<OrderStore>,
}

impl CancelOrderTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CancelOrderTool {
    fn name(&self) -> &str {
        "order_cancel"
    }

    fn description(&self) -> &str {
        "Delete a customer's order that has not been delivered yet. Delivered and returned \
         orders are kept on record and cannot be deleted."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::simple(vec![("customer_id", "The Customer_ID of the order")])
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let id = customer_id(&input)?;
        refusal(
            self.store.cancel_order(id).await,
            format!("The undelivered order for customer {} has been cancelled.", id),
        )
    }
}

pub struct ReturnCheckTool {
    store: Arc<OrderStore>,
    today: Option<NaiveDate>,
}

impl ReturnCheckTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store, today: None }
    }

    /// Evaluate against a fixed date instead of the local clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

#[async_trait]
impl Tool for ReturnCheckTool {
    fn name(&self) -> &str {
        "order_return_check"
    }

    fn description(&self) -> &str {
        "Check whether a customer's order can be returned. Returns are allowed only for \
         delivered orders (Delivered = 'YES') within the return window after purchase. \
         Always use this tool instead of computing eligibility yourself."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::simple(vec![("customer_id", "The Customer_ID of the order")])
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let id = customer_id(&input)?;
        let (order, decision) = self.store.return_eligibility(id, today(self.today)).await?;
        Ok(format!(
            "Customer {} ({}), product '{}', purchased {}, delivered status {}: {}.",
            order.customer_id,
            order.customer_name,
            order.product_name,
            order.purchase_date,
            order.status,
            decision
        ))
    }
}

pub struct ProcessReturnTool {
    store: Arc<OrderStore>,
    today: Option<NaiveDate>,
}

impl ProcessReturnTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store, today: None }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

#[async_trait]
impl Tool for ProcessReturnTool {
    fn name(&self) -> &str {
        "order_process_return"
    }

    fn description(&self) -> &str {
        "Mark a customer's delivered order as RETURNED. The return window is checked first; \
         ineligible orders are left unchanged and the reason is reported."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::simple(vec![("customer_id", "The Customer_ID of the order")])
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let id = customer_id(&input)?;
        match self.store.mark_returned(id, today(self.today)).await {
            Ok(_) => Ok(format!("The order for customer {} is now marked RETURNED.", id)),
            // A refusal is an answer, not a tool failure.
            Err(OrderError::ReturnDenied { decision, .. }) => Ok(format!(
                "Return not processed for customer {}: {}.",
                id, decision
            )),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SqliteDatabase};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn store() -> Arc<OrderStore> {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        let store = OrderStore::new(db.clone(), "orders_2").unwrap();
        store.ensure_schema().await.unwrap();
        for (id, purchased, status) in [
            ("C-1", "2026-10-01", "YES"),
            ("C-2", "2026-08-01", "YES"),
            ("C-3", "2026-10-10", "NO"),
        ] {
            db.execute(
                "INSERT INTO orders_2 (Customer_Name, Customer_ID, Product_Name, Quantity, \
                 Purchase_Date, Delivered) VALUES ('Test', ?, 'Desk', 1, ?, ?)",
                &[id.into(), purchased.into(), status.into()],
            )
            .await
            .unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_return_check_reports_decision() {
        let tool = ReturnCheckTool::new(store().await).with_today(date(2026, 10, 15));

        let ok = tool.execute(json!({"customer_id": "C-1"})).await.unwrap();
        assert!(ok.contains("Eligible for return (14 days"));

        let expired = tool.execute(json!({"customer_id": "C-2"})).await.unwrap();
        assert!(expired.contains("not eligible"));

        assert!(tool.execute(json!({})).await.is_err());
        assert!(tool.execute(json!({"customer_id": "C-404"})).await.is_err());
    }

    #[tokio::test]
    async fn test_place_update_and_deliver() {
        let store = store().await;
        let place = PlaceOrderTool::new(store.clone()).with_today(date(2026, 10, 15));
        let placed = place
            .execute(json!({
                "customer_name": "Ada Lovelace",
                "customer_id": "C-9",
                "region": "West",
                "product_name": "Chair",
                "quantity": "2"
            }))
            .await
            .unwrap();
        assert!(placed.contains("2 x Chair, purchased 2026-10-15, Delivered = NO"));

        let bad = place
            .execute(json!({"customer_name": "X", "customer_id": "C-10",
                            "product_name": "Pen", "quantity": 0}))
            .await;
        assert!(bad.is_err());

        let update = UpdateOrderTool::new(store.clone());
        let updated = update
            .execute(json!({"customer_id": "C-9", "product_name": "Sofa", "quantity": 1}))
            .await
            .unwrap();
        assert!(updated.contains("1 x Sofa"));

        let deliver = MarkDeliveredTool::new(store.clone());
        assert!(deliver
            .execute(json!({"customer_id": "C-9"}))
            .await
            .unwrap()
            .contains("marked delivered"));

        let frozen = update
            .execute(json!({"customer_id": "C-9", "product_name": "Bed", "quantity": 1}))
            .await
            .unwrap();
        assert!(frozen.starts_with("Not changed:"));
        let again = deliver.execute(json!({"customer_id": "C-9"})).await.unwrap();
        assert!(again.starts_with("Not changed:"));

        let order = store.find_order("C-9").await.unwrap();
        assert_eq!(order.product_name, "Sofa");
        assert_eq!(order.status, crate::orders::DeliveryStatus::Yes);
    }

    #[tokio::test]
    async fn test_cancel_only_touches_undelivered_orders() {
        let store = store().await;
        let cancel = CancelOrderTool::new(store.clone());

        let kept = cancel.execute(json!({"customer_id": "C-1"})).await.unwrap();
        assert!(kept.starts_with("Not changed:"));
        assert!(store.find_order("C-1").await.is_ok());

        let gone = cancel.execute(json!({"customer_id": "C-3"})).await.unwrap();
        assert!(gone.contains("cancelled"));
        assert!(matches!(
            store.find_order("C-3").await,
            Err(OrderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_process_return_refuses_without_failing() {
        let store = store().await;
        let tool = ProcessReturnTool::new(store.clone()).with_today(date(2026, 10, 15));

        let refused = tool.execute(json!({"customer_id": "C-3"})).await.unwrap();
        assert!(refused.contains("hasn't been delivered"));

        let done = tool.execute(json!({"customer_id": "C-1"})).await.unwrap();
        assert!(done.contains("RETURNED"));
        let order = store.find_order("C-1").await.unwrap();
        assert_eq!(order.status, crate::orders::DeliveryStatus::Returned);

        let again = tool.execute(json!({"customer_id": "C-1"})).await.unwrap();
        assert!(again.contains("already been returned"));
    }
}
