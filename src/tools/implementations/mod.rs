// Tool implementations

// Database tools
pub mod sql;

// Order lifecycle tools (orders profile)
pub mod orders;

// HR escalation (escalation profile)
pub mod escalation;

pub use escalation::EscalationPathTool;
pub use orders::{
    CancelOrderTool, MarkDeliveredTool, PlaceOrderTool, ProcessReturnTool, ReturnCheckTool,
    UpdateOrderTool,
};
pub use sql::{ListTablesTool, QueryTool, SchemaTool};
