// SQL tools - list tables, describe schema, run a statement
//
// All three share one SqlDatabase, so the table allowlist and access policy
// apply uniformly.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::db::SqlDatabase;
use crate::tools::registry::Tool;
use crate::tools::types::ToolInputSchema;

pub struct ListTablesTool {
    db: Arc<SqlDatabase>,
}

impl ListTablesTool {
    pub fn new(db: Arc<SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &str {
        "sql_db_list_tables"
    }

    fn description(&self) -> &str {
        "Input is an empty string, output is a comma-separated list of tables in the database."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::empty()
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        let tables = self.db.usable_tables().await?;
        if tables.is_empty() {
            return Ok("The database has no tables.".to_string());
        }
        Ok(tables.join(", "))
    }
}

pub struct SchemaTool {
    db: Arc<SqlDatabase>,
}

impl SchemaTool {
    pub fn new(db: Arc<SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for SchemaTool {
    fn name(&self) -> &str {
        "sql_db_schema"
    }

    fn description(&self) -> &str {
        "Input to this tool is a comma-separated list of tables, output is the schema and \
         sample rows for those tables. Be sure that the tables actually exist by calling \
         sql_db_list_tables first! Example Input: table1, table2, table3"
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::simple(vec![(
            "table_names",
            "A comma-separated list of the table names for which to return the schema",
        )])
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let raw = input["table_names"]
            .as_str()
            .context("Missing table_names parameter")?;
        let tables = parse_table_names(raw);
        if tables.is_empty() {
            anyhow::bail!("table_names must name at least one table");
        }
        self.db.table_info(&tables).await
    }
}

pub struct QueryTool {
    db: Arc<SqlDatabase>,
}

impl QueryTool {
    pub fn new(db: Arc<SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for QueryTool {
    fn name(&self) -> &str {
        "sql_db_query"
    }

    fn description(&self) -> &str {
        "Input to this tool is a detailed and correct SQL query, output is a result from the \
         database. If the query is not correct, an error message will be returned. If an error \
         is returned, rewrite the query, check the query, and try again. If you encounter an \
         issue with Unknown column 'xxxx' in 'field list', use sql_db_schema to query the \
         correct table fields."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::simple(vec![("query", "A detailed and correct SQL query")])
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let query = input["query"].as_str().context("Missing query parameter")?;
        self.db.run(strip_code_fence(query)).await
    }
}

/// Split "a, b,`c`" into table names, dropping quotes and blanks.
fn parse_table_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().trim_matches(|c| c == '`' || c == '"' || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Models sometimes wrap SQL in a markdown fence.
fn strip_code_fence(query: &str) -> &str {
    let trimmed = query.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest
                .strip_prefix("sql")
                .or_else(|| rest.strip_prefix("SQL"))
                .unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}
