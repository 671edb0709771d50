// Tool execution engine
//
// Every outcome, including unknown tools and failures, becomes a
// ToolResult so the model can correct itself on the next turn.

use tracing::{error, info, instrument};

use crate::tools::registry::ToolRegistry;
use crate::tools::types::{ToolDefinition, ToolResult, ToolUse};

/// Tool executor - manages tool execution lifecycle
pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Execute a single tool use
    #[instrument(skip(self, tool_use), fields(tool = %tool_use.name, id = %tool_use.id))]
    pub async fn execute_tool(&self, tool_use: &ToolUse) -> ToolResult {
        info!("Executing tool: {}", tool_use.name);

        let Some(tool) = self.registry.get(&tool_use.name) else {
            error!("Unknown tool requested");
            return ToolResult::error(
                tool_use.id.clone(),
                format!(
                    "Error: '{}' is not a valid tool, try one of [{}].",
                    tool_use.name,
                    self.registry.names().join(", ")
                ),
            );
        };

        match tool.execute(tool_use.input.clone()).await {
            Ok(output) => {
                info!("Tool executed successfully");
                ToolResult::success(tool_use.id.clone(), output)
            }
            Err(e) => {
                error!("Tool execution failed: {:#}", e);
                ToolResult::error(tool_use.id.clone(), format!("Error: {:#}", e))
            }
        }
    }

    /// Execute tool uses in sequence
    pub async fn execute_all(&self, tool_uses: &[ToolUse]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(tool_uses.len());
        for tool_use in tool_uses {
            results.push(self.execute_tool(tool_use).await);
        }
        results
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}
