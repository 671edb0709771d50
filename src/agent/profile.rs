// Agent profiles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prompt and tool configuration the agent runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgentProfile {
    /// Schema-aware analyst over the supermarket tables
    #[default]
    Analyst,
    /// Order desk restricted to the orders table
    Orders,
    /// HR escalation assistant
    Escalation,
}

impl AgentProfile {
    pub fn name(&self) -> &'static str {
        match self {
            AgentProfile::Analyst => "analyst",
            AgentProfile::Orders => "orders",
            AgentProfile::Escalation => "escalation",
        }
    }

    /// Whether the profile gets the order return tools
    pub fn has_order_tools(&self) -> bool {
        matches!(self, AgentProfile::Orders)
    }

    pub fn has_escalation_tool(&self) -> bool {
        matches!(self, AgentProfile::Escalation)
    }
}

impl fmt::Display for AgentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
