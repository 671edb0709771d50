// Orders
//
// Order lifecycle (NO -> YES -> RETURNED) and the return window.

mod eligibility;
mod model;
mod store;

pub use eligibility::{check_return, days_since, ReturnDecision, RETURN_WINDOW_DAYS};
pub use model::{
    parse_date, DeliveryStatus, NewOrder, OrderSummary, PendingOrder, CATEGORIES, REGIONS,
    SEGMENTS,
};
pub use store::{OrderError, OrderResult, OrderStore};
