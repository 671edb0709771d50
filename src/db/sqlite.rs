// SQLite backend (rusqlite)
//
// The connection is shared behind a tokio Mutex, the same way the memory
// store guards its connection; statements run synchronously while the lock
// is held.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Database, Dialect, QueryOutput, SqlValue};

pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
    read_only: bool,
}

impl SqliteDatabase {
    /// Open a database file. Read-only handles never create the file.
    pub fn open(path: &Path, read_only: bool) -> Result<Self> {
        let conn = if read_only {
            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_context(|| format!("Failed to open database read-only: {}", path.display()))?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            let conn = Connection::open(path)
                .with_context(|| format!("Failed to open database: {}", path.display()))?;
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            conn
        };

        tracing::debug!(
            "Opened SQLite database {} (read_only={})",
            path.display(),
            read_only
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
            read_only,
        })
    }

    /// Private in-memory database (tests, scratch sessions)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
            read_only: false,
        })
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Text(format!("<blob {} bytes>", b.len())),
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite://{}", path.display()),
            None => "sqlite://:memory:".to_string(),
        }
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(sql)
            .with_context(|| format!("Failed to prepare statement: {}", sql))?;
        if !stmt.readonly() {
            bail!("Only statements that leave the database unchanged can be queried: {}", sql);
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len();

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..column_count)
                    .map(|i| row.get_ref(i).map(from_value_ref))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Query failed: {}", sql))?;

        Ok(QueryOutput { columns, rows })
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        if self.read_only {
            bail!("Database is opened read-only; refusing to modify it");
        }
        let conn = self.conn.lock().await;
        let affected = conn
            .execute(sql, params_from_iter(params.iter()))
            .with_context(|| format!("Statement failed: {}", sql))?;
        Ok(affected as u64)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let out = self
            .query(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
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
        let out = self
            .query(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                &[SqlValue::from(table)],
            )
            .await?;
        match out.rows.first().and_then(|row| row.first()) {
            Some(SqlValue::Text(ddl)) => Ok(ddl.clone()),
            _ => bail!("Table '{}' not found", table),
        }
    }
}
