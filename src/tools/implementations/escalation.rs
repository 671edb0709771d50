// Escalation tool - where does an issue go next?

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::agent::Role;
use crate::tools::registry::Tool;
use crate::tools::types::ToolInputSchema;

pub struct EscalationPathTool;

#[async_trait]
impl Tool for EscalationPathTool {
    fn name(&self) -> &str {
        "escalation_path"
    }

    fn description(&self) -> &str {
        "Given the role of the person raising an issue, return the role it escalates to, \
         the manager table to query for that person, and the rest of the chain. Roles: \
         Customer, State Manager, Regional Manager, Segment Manager, Category Manager."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::simple(vec![("role", "Role of the person raising the issue")])
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let role: Role = input["role"]
            .as_str()
            .context("Missing role parameter")?
            .parse()?;

        let Some(next) = role.escalates_to() else {
            return Ok(format!(
                "{} is the top of the hierarchy; there is no further escalation.",
                role
            ));
        };

        let lookup = match (next.manager_table(), next.lookup_key()) {
            (Some(table), Some(key)) => format!(
                "Look up the manager in table `{}` by the person's {}.",
                table, key
            ),
            _ => "There is no manager table for this level; address it to LOB/Executive leadership."
                .to_string(),
        };
        let chain: Vec<&str> = role.chain().iter().map(Role::label).collect();

        Ok(format!(
            "{} escalates to {}. {} Full chain: {} -> {}.",
            role,
            next,
            lookup,
            role,
            chain.join(" -> ")
        ))
    }
}
