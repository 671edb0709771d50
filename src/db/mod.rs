// Database backends
//
// A small async abstraction over the two kinds of database the agent can
// talk to: a local SQLite file and a MySQL server. Everything above this
// layer (order store, SQL tools) works against `dyn Database`.

mod mysql;
pub mod policy;
mod sql_database;
mod sqlite;

pub use mysql::MySqlDatabase;
pub use policy::{AccessPolicy, PolicyDecision, StatementKind};
pub use sql_database::SqlDatabase;
pub use sqlite::SqliteDatabase;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::DatabaseConfig;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("valid identifier regex"));

/// True if `name` can be interpolated into SQL as a table or column name.
pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= 64 && IDENTIFIER.is_match(name)
}

/// SQL dialect of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Sqlite,
    MySql,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "SQLite",
            Dialect::MySql => "MySQL",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single bound parameter or result cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; numeric text and whole reals are accepted since
    /// spreadsheet-imported tables often store quantities loosely typed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            SqlValue::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Real(f)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(d: NaiveDate) -> Self {
        SqlValue::Text(d.format("%Y-%m-%d").to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Result set of a read statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryOutput {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Case-insensitive column lookup
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_json_rows(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let map: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, value)| {
                        let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                        (col.clone(), json)
                    })
                    .collect();
                serde_json::Value::Object(map)
            })
            .collect()
    }

    /// Render as an aligned, pipe-separated text table.
    pub fn render_table(&self) -> String {
        if self.columns.is_empty() {
            return "(no columns)".to_string();
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string().replace('\n', " ")).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let format_row = |values: &[String]| -> String {
            values
                .iter()
                .zip(widths.iter())
                .map(|(v, w)| format!("{:<width$}", v, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = Vec::with_capacity(cells.len() + 3);
        out.push(format_row(&self.columns));
        out.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &cells {
            out.push(format_row(row));
        }
        out.push(format!(
            "({} row{})",
            cells.len(),
            if cells.len() == 1 { "" } else { "s" }
        ));
        out.join("\n")
    }
}

/// Async database backend
///
/// Statements use `?` positional placeholders, which both SQLite and MySQL
/// accept.
#[async_trait]
pub trait Database: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Human-readable location for logs (never contains a password)
    fn describe(&self) -> String;

    /// Whether the backend was opened read-only
    fn is_read_only(&self) -> bool;

    /// Run a statement that returns rows
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput>;

    /// Run a statement that changes data; returns rows affected
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// All user tables, sorted by name
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// CREATE TABLE statement for `table`
    async fn table_ddl(&self, table: &str) -> Result<String>;

    /// Connection smoke test
    async fn ping(&self) -> Result<()> {
        self.query("SELECT 1", &[]).await.map(|_| ())
    }
}

/// Open the backend described by `config` and smoke-test it.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Database>> {
    let db: Arc<dyn Database> = match config {
        DatabaseConfig::Sqlite { path, read_only } => {
            Arc::new(SqliteDatabase::open(path, *read_only)?)
        }
        DatabaseConfig::Mysql(settings) => Arc::new(MySqlDatabase::connect(settings).await?),
    };

    db.ping().await?;
    tracing::info!("Connected to {} ({})", db.describe(), db.dialect());
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QueryOutput {
        QueryOutput {
            columns: vec!["Customer_ID".to_string(), "Quantity".to_string()],
            rows: vec![
                vec![SqlValue::from("C-1"), SqlValue::Integer(3)],
                vec![SqlValue::from("C-22"), SqlValue::Null],
            ],
        }
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("orders_2"));
        assert!(is_valid_identifier("Customer_ID"));
        assert!(!is_valid_identifier("orders; DROP TABLE x"));
        assert!(!is_valid_identifier("`orders`"));
        assert!(!is_valid_identifier("2orders"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let out = sample();
        assert_eq!(out.column_index("customer_id"), Some(0));
        assert_eq!(out.get(0, "QUANTITY"), Some(&SqlValue::Integer(3)));
        assert_eq!(out.get(5, "quantity"), None);
    }

    #[test]
    fn test_render_table() {
        let table = sample().render_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Customer_ID | Quantity");
        assert!(lines[2].starts_with("C-1 "));
        assert!(lines[3].contains("NULL"));
        assert_eq!(lines.last(), Some(&"(2 rows)"));
    }

    #[test]
    fn test_json_rows() {
        let rows = sample().to_json_rows();
        assert_eq!(rows[0]["Customer_ID"], "C-1");
        assert_eq!(rows[0]["Quantity"], 3);
        assert!(rows[1]["Quantity"].is_null());
    }

    #[test]
    fn test_as_i64_accepts_loose_types() {
        assert_eq!(SqlValue::Text(" 7 ".to_string()).as_i64(), Some(7));
        assert_eq!(SqlValue::Real(4.0).as_i64(), Some(4));
        assert_eq!(SqlValue::Real(4.5).as_i64(), None);
        assert_eq!(SqlValue::Null.as_i64(), None);
    }

    #[test]
    fn test_date_converts_to_iso_text() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(SqlValue::from(d), SqlValue::Text("2026-03-09".to_string()));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
    }
}
