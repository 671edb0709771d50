// `orderdesk orders ...` handlers
//
// Direct order management through OrderStore, no model involved.

use anyhow::{bail, Result};
use chrono::NaiveDate;

use super::args::{OrdersCommand, PlaceArgs};
use crate::orders::{NewOrder, OrderError, OrderStore, OrderSummary, PendingOrder};

impl OrdersCommand {
    /// Whether the command changes rows
    pub fn writes(&self) -> bool {
        !matches!(
            self,
            OrdersCommand::List | OrdersCommand::Undelivered | OrdersCommand::CheckReturn { .. }
        )
    }
}

impl From<PlaceArgs> for NewOrder {
    fn from(args: PlaceArgs) -> Self {
        NewOrder {
            customer_name: args.customer_name,
            customer_id: args.customer_id,
            segment: args.segment,
            country: args.country,
            state: args.state,
            postal_code: args.postal_code,
            region: args.region,
            category: args.category,
            product_name: args.product,
            quantity: args.quantity,
        }
    }
}

/// Run one orders subcommand and return the text to print.
pub async fn handle_orders(
    command: OrdersCommand,
    store: &OrderStore,
    read_only: bool,
    today: NaiveDate,
) -> Result<String> {
    if command.writes() && read_only {
        bail!("The database is open read-only; pass --read-write to change orders");
    }

    let output = match command {
        OrdersCommand::Init => {
            store.ensure_schema().await?;
            format!("Orders table `{}` is ready.", store.table())
        }
        OrdersCommand::Place(args) => {
            let order = NewOrder::from(args);
            store.insert_order(&order, today).await?;
            format!(
                "Order placed for {} ({}): {} x {} on {}.",
                order.customer_name, order.customer_id, order.quantity, order.product_name, today
            )
        }
        OrdersCommand::List => render_summaries(&store.all_orders().await?),
        OrdersCommand::Undelivered => render_pending(&store.undelivered_orders().await?),
        OrdersCommand::Update {
            customer_id,
            product,
            quantity,
        } => {
            store.update_order(&customer_id, &product, quantity).await?;
            format!(
                "Order for {} updated: {} x {}.",
                customer_id, quantity, product
            )
        }
        OrdersCommand::Deliver { customer_id } => {
            store.mark_delivered(&customer_id).await?;
            format!("Order for {} marked delivered.", customer_id)
        }
        OrdersCommand::CheckReturn { customer_id } => {
            let (order, decision) = store.return_eligibility(&customer_id, today).await?;
            format!(
                "{} ({}, purchased {}): {}",
                order.customer_id, order.product_name, order.purchase_date, decision
            )
        }
        OrdersCommand::Cancel { customer_id } => {
            store.cancel_order(&customer_id).await?;
            format!("Undelivered order for {} cancelled.", customer_id)
        }
        OrdersCommand::Return { customer_id } => {
            match store.mark_returned(&customer_id, today).await {
                Ok(_) => format!("Return processed for {}.", customer_id),
                Err(OrderError::ReturnDenied { decision, .. }) => decision.to_string(),
                Err(e) => return Err(e.into()),
            }
        }
    };
    Ok(output)
}

fn render_pending(orders: &[PendingOrder]) -> String {
    if orders.is_empty() {
        return "No undelivered orders.".to_string();
    }
    let mut out = format!("{} undelivered order(s):\n", orders.len());
    for o in orders {
        out.push_str(&format!(
            "  {:<12} {:<24} {} x {}\n",
            o.customer_id, o.customer_name, o.quantity, o.product_name
        ));
    }
    out.trim_end().to_string()
}

fn render_summaries(orders: &[OrderSummary]) -> String {
    if orders.is_empty() {
        return "No orders.".to_string();
    }
    let mut out = format!("{} order(s):\n", orders.len());
    for o in orders {
        out.push_str(&format!(
            "  {:<12} {:<24} {:<10} {:<8} {}\n",
            o.customer_id, o.customer_name, o.purchase_date, o.status, o.product_name
        ));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SqliteDatabase};
    use std::sync::Arc;

    fn place(id: &str) -> OrdersCommand {
        OrdersCommand::Place(PlaceArgs {
            customer_name: "Ada Byron".to_string(),
            customer_id: id.to_string(),
            segment: "Consumer".to_string(),
            country: "United States".to_string(),
            state: "Ohio".to_string(),
            postal_code: "43215".to_string(),
            region: "East".to_string(),
            category: "Furniture".to_string(),
            product: "Desk".to_string(),
            quantity: 2,
        })
    }

    async fn store() -> OrderStore {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        let store = OrderStore::new(db, "orders_2").unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let store = store().await;
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let err = handle_orders(place("C-1"), &store, true, today).await.unwrap_err();
        assert!(err.to_string().contains("--read-write"));

        let listing = handle_orders(OrdersCommand::List, &store, true, today).await.unwrap();
        assert_eq!(listing, "No orders.");
    }

    #[tokio::test]
    async fn test_place_deliver_return() {
        let store = store().await;
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        handle_orders(place("C-1"), &store, false, today).await.unwrap();
        let pending = handle_orders(OrdersCommand::Undelivered, &store, false, today)
            .await
            .unwrap();
        assert!(pending.contains("C-1"));
        assert!(pending.contains("2 x Desk"));

        let early = handle_orders(
            OrdersCommand::Return {
                customer_id: "C-1".to_string(),
            },
            &store,
            false,
            today,
        )
        .await
        .unwrap();
        assert!(early.contains("hasn't been delivered"));

        handle_orders(
            OrdersCommand::Deliver {
                customer_id: "C-1".to_string(),
            },
            &store,
            false,
            today,
        )
        .await
        .unwrap();
        let done = handle_orders(
            OrdersCommand::Return {
                customer_id: "C-1".to_string(),
            },
            &store,
            false,
            today,
        )
        .await
        .unwrap();
        assert_eq!(done, "Return processed for C-1.");

        let cancel = |id: &str| OrdersCommand::Cancel {
            customer_id: id.to_string(),
        };
        assert!(handle_orders(cancel("C-1"), &store, false, today).await.is_err());
        assert!(handle_orders(cancel("C-1"), &store, true, today).await.is_err());
        handle_orders(place("C-2"), &store, false, today).await.unwrap();
        let cancelled = handle_orders(cancel("C-2"), &store, false, today).await.unwrap();
        assert_eq!(cancelled, "Undelivered order for C-2 cancelled.");
    }
}
