// Agent-facing view of a database
//
// Wraps a backend with an optional table allowlist and an access policy,
// and renders schema/results as text the model can read.

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::policy::{AccessPolicy, PolicyDecision, StatementKind};
use super::{is_valid_identifier, Database, Dialect};

const SAMPLE_ROWS: usize = 3;
const DEFAULT_MAX_RESULT_CHARS: usize = 4_000;

pub struct SqlDatabase {
    db: Arc<dyn Database>,
    include_tables: Option<Vec<String>>,
    policy: AccessPolicy,
    max_result_chars: usize,
}

impl SqlDatabase {
    /// All tables visible; writes allowed unless the backend is read-only.
    pub fn new(db: Arc<dyn Database>) -> Self {
        let policy = AccessPolicy {
            read_only: db.is_read_only(),
            ..Default::default()
        }
        .for_dialect(db.dialect());
        Self {
            db,
            include_tables: None,
            policy,
            max_result_chars: DEFAULT_MAX_RESULT_CHARS,
        }
    }

    /// Restrict the agent to `tables` (schema listing and statement policy).
    pub fn with_include_tables(mut self, tables: Vec<String>) -> Self {
        self.policy.allowed_tables = Some(tables.clone());
        self.include_tables = Some(tables);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.policy.read_only = read_only || self.db.is_read_only();
        self
    }

    pub fn with_schema_changes(mut self, allow: bool) -> Self {
        self.policy.allow_schema_changes = allow;
        self
    }

    /// Tables the agent may read but must change through typed tools
    pub fn with_protected_tables(mut self, tables: Vec<String>) -> Self {
        self.policy.protected_tables = tables;
        self
    }

    pub fn with_max_result_chars(mut self, max: usize) -> Self {
        self.max_result_chars = max.max(1);
        self
    }

    pub fn backend(&self) -> &Arc<dyn Database> {
        &self.db
    }

    pub fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn is_read_only(&self) -> bool {
        self.policy.read_only
    }

    /// Tables the agent may see: the allowlist (when present tables only)
    /// or every table in the database.
    pub async fn usable_tables(&self) -> Result<Vec<String>> {
        let all = self.db.list_tables().await?;
        Ok(match &self.include_tables {
            Some(include) => all
                .into_iter()
                .filter(|t| include.iter().any(|i| i.eq_ignore_ascii_case(t)))
                .collect(),
            None => all,
        })
    }

    /// DDL plus a few sample rows for each requested table.
    /// An empty request means every usable table.
    pub async fn table_info(&self, tables: &[String]) -> Result<String> {
        let usable = self.usable_tables().await?;

        let requested: Vec<String> = if tables.is_empty() {
            usable.clone()
        } else {
            tables.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
        };

        let unknown: Vec<&String> = requested
            .iter()
            .filter(|t| !usable.iter().any(|u| u.eq_ignore_ascii_case(t)))
            .collect();
        if !unknown.is_empty() {
            bail!(
                "table_names {:?} not found in database. Available tables: {}",
                unknown,
                usable.join(", ")
            );
        }

        let mut sections = Vec::with_capacity(requested.len());
        for table in &requested {
            let ddl = self.db.table_ddl(table).await?;
            let mut section = ddl.trim().to_string();

            if is_valid_identifier(table) {
                let sample_sql = format!("SELECT * FROM `{}` LIMIT {}", table, SAMPLE_ROWS);
                match self.db.query(&sample_sql, &[]).await {
                    Ok(sample) => {
                        section.push_str(&format!(
                            "\n\n/*\n{} rows from {} table:\n{}\n*/",
                            sample.len(),
                            table,
                            sample.render_table()
                        ));
                    }
                    Err(e) => warn!("Could not sample rows from {}: {}", table, e),
                }
            }

            sections.push(section);
        }

        Ok(sections.join("\n\n"))
    }

    /// Run one statement under the access policy and render the outcome.
    pub async fn run(&self, sql: &str) -> Result<String> {
        let sql = sql.trim();
        let catalog = if self.policy.uses_catalog() {
            self.db.list_tables().await?
        } else {
            Vec::new()
        };
        if let PolicyDecision::Deny(reason) = self.policy.check_with_catalog(sql, &catalog) {
            info!("Statement refused: {}", reason);
            bail!("{}", reason);
        }

        let kind = StatementKind::classify(sql, self.dialect());
        debug!("Running {:?} statement: {}", kind, sql);

        let rendered = if kind.returns_rows() {
            let out = self.db.query(sql, &[]).await?;
            if out.is_empty() {
                "Query returned no rows.".to_string()
            } else {
                out.render_table()
            }
        } else {
            let affected = self.db.execute(sql, &[]).await?;
            format!(
                "Statement executed. {} row{} affected.",
                affected,
                if affected == 1 { "" } else { "s" }
            )
        };

        Ok(truncate_chars(rendered, self.max_result_chars))
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text;
    }
    let kept: String = text.chars().take(max).collect();
    format!(
        "{}\n\n[Result truncated - showing first {} of {} characters]",
        kept, max, total
    )
}
