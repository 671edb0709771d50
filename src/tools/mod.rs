// Tool execution system
//
// Tools the agent can call: SQL access, order returns, escalation lookup.

pub mod executor;
pub mod implementations;
pub mod registry;
pub mod types;

pub use executor::ToolExecutor;
pub use registry::{Tool, ToolRegistry};
pub use types::{ToolDefinition, ToolInputSchema, ToolResult, ToolUse};
