// MySQL backend (sqlx)
//
// Rows are decoded into `SqlValue` by trying the column's compatible Rust
// types, since the agent issues arbitrary statements whose shape is not
// known at compile time.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Executor, MySql, Row};
use std::time::Duration;

use super::{is_valid_identifier, Database, Dialect, QueryOutput, SqlValue, StatementKind};
use crate::config::MySqlSettings;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

pub struct MySqlDatabase {
    pool: MySqlPool,
    location: String,
    read_only: bool,
}

impl MySqlDatabase {
    /// Build a pool from discrete connection fields. Credentials go through
    /// `MySqlConnectOptions` so passwords never need URL escaping.
    pub async fn connect(settings: &MySqlSettings) -> Result<Self> {
        let missing = settings.missing_fields();
        if !missing.is_empty() {
            bail!(
                "Please provide all MySQL connection details (missing: {})",
                missing.join(", ")
            );
        }

        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database);

        let location = settings.redacted_url();
        let mut pool_options = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .test_before_acquire(true);
        if settings.read_only {
            // The server then rejects writes whatever the statement looks like.
            pool_options = pool_options.after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET SESSION TRANSACTION READ ONLY").await?;
                    Ok(())
                })
            });
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Connection failed: {}", location))?;

        Ok(Self {
            pool,
            location,
            read_only: settings.read_only,
        })
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(i) => query.bind(*i),
        SqlValue::Real(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.as_str()),
    }
}

fn build_query<'q>(sql: &'q str, params: &'q [SqlValue]) -> Query<'q, MySql, MySqlArguments> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

fn or_null<T>(value: Option<T>, f: impl FnOnce(T) -> SqlValue) -> SqlValue {
    value.map(f).unwrap_or(SqlValue::Null)
}

/// Decode one cell by trying the Rust types MySQL columns map onto.
/// `try_get` checks type compatibility before decoding, so a mismatch is
/// an `Err` rather than a panic.
fn decode_cell(row: &MySqlRow, idx: usize) -> SqlValue {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return or_null(v, SqlValue::Integer);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return or_null(v, |u| match i64::try_from(u) {
            Ok(i) => SqlValue::Integer(i),
            Err(_) => SqlValue::Text(u.to_string()),
        });
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return or_null(v, SqlValue::Real);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return or_null(v, |f| SqlValue::Real(f as f64));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return or_null(v, SqlValue::Text);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return or_null(v, SqlValue::from);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return or_null(v, |dt| SqlValue::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()));
    }
    if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
        return or_null(v, |t| SqlValue::Text(t.format("%H:%M:%S").to_string()));
    }
    // DECIMAL arrives as its textual form on the wire.
    if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(idx) {
        return or_null(v, SqlValue::Text);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return or_null(v, |b| SqlValue::Text(String::from_utf8_lossy(&b).into_owned()));
    }
    SqlValue::Null
}

fn to_output(rows: Vec<MySqlRow>) -> QueryOutput {
    use sqlx::Column;

    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|i| decode_cell(row, i)).collect())
        .collect();

    QueryOutput { columns, rows }
}

#[async_trait]
impl Database for MySqlDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn describe(&self) -> String {
        self.location.clone()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput> {
        if self.read_only && StatementKind::classify(sql, Dialect::MySql) != StatementKind::Read {
            bail!("Database is configured read-only; refusing to run: {}", sql);
        }
        let rows = build_query(sql, params)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Query failed: {}", sql))?;
        Ok(to_output(rows))
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        if self.read_only {
            bail!("Database is configured read-only; refusing to modify it");
        }
        let result = build_query(sql, params)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Statement failed: {}", sql))?;
        Ok(result.rows_affected())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let out = self
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() ORDER BY table_name",
                &[],
            )
            .await?;
        Ok(out
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(|v| v.to_string())
            .collect())
    }

    async fn table_ddl(&self, table: &str) -> Result<String> {
        if !is_valid_identifier(table) {
            bail!("Invalid table name: {}", table);
        }
        let out = self
            .query(&format!("SHOW CREATE TABLE `{}`", table), &[])
            .await
            .with_context(|| format!("Table '{}' not found", table))?;
        match out.rows.first().and_then(|row| row.get(1)) {
            Some(SqlValue::Text(ddl)) => Ok(ddl.clone()),
            _ => bail!("Table '{}' not found", table),
        }
    }
}
