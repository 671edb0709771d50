// Order records

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::{QueryOutput, SqlValue};

pub const SEGMENTS: &[&str] = &["Consumer", "Home Office", "Corporate"];
pub const REGIONS: &[&str] = &["West", "East", "Central", "South"];
pub const CATEGORIES: &[&str] = &["Office Supplies", "Furniture", "Technology"];

/// Value of the `Delivered` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    No,
    Yes,
    Returned,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::No => "NO",
            DeliveryStatus::Yes => "YES",
            DeliveryStatus::Returned => "RETURNED",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NO" => Ok(DeliveryStatus::No),
            "YES" => Ok(DeliveryStatus::Yes),
            "RETURNED" => Ok(DeliveryStatus::Returned),
            other => Err(anyhow!("Unknown delivery status '{}'", other)),
        }
    }
}

/// Fields supplied when placing an order. Purchase date and status are
/// assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_id: String,
    pub segment: String,
    pub country: String,
    pub state: String,
    pub postal_code: String,
    pub region: String,
    pub category: String,
    pub product_name: String,
    pub quantity: i64,
}

impl NewOrder {
    /// Problems with the order, empty when it can be inserted
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (label, value) in [
            ("customer name", &self.customer_name),
            ("customer id", &self.customer_id),
            ("product name", &self.product_name),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{} is required", label));
            }
        }
        if self.quantity < 1 {
            problems.push(format!("quantity must be at least 1 (got {})", self.quantity));
        }
        for (label, value, allowed) in [
            ("segment", &self.segment, SEGMENTS),
            ("region", &self.region, REGIONS),
            ("category", &self.category, CATEGORIES),
        ] {
            if !value.is_empty() && !allowed.contains(&value.as_str()) {
                problems.push(format!(
                    "{} '{}' is not one of: {}",
                    label,
                    value,
                    allowed.join(", ")
                ));
            }
        }
        problems
    }
}

/// Row of the undelivered-orders listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingOrder {
    pub customer_id: String,
    pub customer_name: String,
    pub product_name: String,
    pub quantity: i64,
}

/// Row of the all-orders listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub customer_id: String,
    pub customer_name: String,
    pub product_name: String,
    pub purchase_date: NaiveDate,
    pub status: DeliveryStatus,
}

/// Parse a stored date. Accepts `YYYY-MM-DD` and datetime text whose first
/// ten characters are a date (spreadsheet imports store midnight times).
pub fn parse_date(value: &SqlValue) -> Result<NaiveDate> {
    let text = match value {
        SqlValue::Text(s) => s.trim(),
        other => return Err(anyhow!("Expected a date, found {}", other)),
    };
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| anyhow!("Invalid date '{}': {}", text, e))
}

fn text(out: &QueryOutput, row: usize, column: &str) -> Result<String> {
    out.get(row, column)
        .map(|v| if v.is_null() { String::new() } else { v.to_string() })
        .ok_or_else(|| anyhow!("Column {} missing from result", column))
}

fn integer(out: &QueryOutput, row: usize, column: &str) -> Result<i64> {
    out.get(row, column)
        .and_then(SqlValue::as_i64)
        .ok_or_else(|| anyhow!("Column {} is not an integer", column))
}

impl PendingOrder {
    pub fn from_rows(out: &QueryOutput) -> Result<Vec<Self>> {
        (0..out.len())
            .map(|i| {
                Ok(Self {
                    customer_id: text(out, i, "Customer_ID")?,
                    customer_name: text(out, i, "Customer_Name")?,
                    product_name: text(out, i, "Product_Name")?,
                    quantity: integer(out, i, "Quantity")?,
                })
            })
            .collect()
    }
}

impl OrderSummary {
    pub fn from_rows(out: &QueryOutput) -> Result<Vec<Self>> {
        (0..out.len())
            .map(|i| {
                let date = out
                    .get(i, "Purchase_Date")
                    .ok_or_else(|| anyhow!("Column Purchase_Date missing from result"))?;
                Ok(Self {
                    customer_id: text(out, i, "Customer_ID")?,
                    customer_name: text(out, i, "Customer_Name")?,
                    product_name: text(out, i, "Product_Name")?,
                    purchase_date: parse_date(date)?,
                    status: text(out, i, "Delivered")?.parse()?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> NewOrder {
        NewOrder {
            customer_name: "Alice Green".to_string(),
            customer_id: "C-5001".to_string(),
            segment: "Consumer".to_string(),
            region: "West".to_string(),
            category: "Furniture".to_string(),
            product_name: "Office Chair".to_string(),
            quantity: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("yes".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Yes);
        assert_eq!(" Returned ".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Returned);
        assert!("shipped".parse::<DeliveryStatus>().is_err());
        assert_eq!(DeliveryStatus::No.to_string(), "NO");
    }

    #[test]
    fn test_new_order_validation() {
        assert!(order().problems().is_empty());

        let mut bad = order();
        bad.quantity = 0;
        bad.customer_id = " ".to_string();
        bad.region = "North".to_string();
        let problems = bad.problems();
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("customer id")));
        assert!(problems.iter().any(|p| p.contains("North")));
    }

    #[test]
    fn test_parse_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        assert_eq!(parse_date(&SqlValue::from("2026-09-01")).unwrap(), expected);
        assert_eq!(parse_date(&SqlValue::from("2026-09-01 00:00:00")).unwrap(), expected);
        assert!(parse_date(&SqlValue::from("09/01/2026")).is_err());
        assert!(parse_date(&SqlValue::Null).is_err());
    }

    #[test]
    fn test_summary_from_rows() {
        let out = QueryOutput {
            columns: ["Customer_ID", "Customer_Name", "Product_Name", "Purchase_Date", "Delivered"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: vec![vec![
                "C-1".into(),
                "Bob".into(),
                "Stapler".into(),
                "2026-10-01".into(),
                "yes".into(),
            ]],
        };
        let rows = OrderSummary::from_rows(&out).unwrap();
        assert_eq!(rows[0].status, DeliveryStatus::Yes);
        assert_eq!(rows[0].purchase_date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
    }
}
