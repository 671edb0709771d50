// Return eligibility
//
// A delivered order may be returned within the window after purchase.

use chrono::NaiveDate;
use std::fmt;

use super::model::DeliveryStatus;

/// Days after purchase during which a delivered order may be returned
pub const RETURN_WINDOW_DAYS: i64 = 30;

/// Outcome of a return request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDecision {
    Eligible { days_since_purchase: i64 },
    AlreadyReturned,
    NotDelivered,
    WindowExpired { days_since_purchase: i64, window_days: i64 },
}

impl ReturnDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, ReturnDecision::Eligible { .. })
    }
}

impl fmt::Display for ReturnDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnDecision::Eligible { days_since_purchase } => write!(
                f,
                "Eligible for return ({} days since purchase)",
                days_since_purchase
            ),
            ReturnDecision::AlreadyReturned => f.write_str("This order has already been returned"),
            ReturnDecision::NotDelivered => f.write_str(
                "This order hasn't been delivered yet, so it cannot be returned",
            ),
            ReturnDecision::WindowExpired {
                days_since_purchase,
                window_days,
            } => write!(
                f,
                "This order is not eligible for return ({} days since purchase, limit is {})",
                days_since_purchase, window_days
            ),
        }
    }
}

/// Whole days from `purchase_date` to `today`; negative for future dates.
pub fn days_since(purchase_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - purchase_date).num_days()
}

/// Authorized iff the order is delivered and at most `window_days` have
/// elapsed since purchase.
pub fn check_return(
    status: DeliveryStatus,
    purchase_date: NaiveDate,
    today: NaiveDate,
    window_days: i64,
) -> ReturnDecision {
    let days = days_since(purchase_date, today);
    match status {
        DeliveryStatus::Yes if days <= window_days => ReturnDecision::Eligible {
            days_since_purchase: days,
        },
        DeliveryStatus::Yes => ReturnDecision::WindowExpired {
            days_since_purchase: days,
            window_days,
        },
        DeliveryStatus::Returned => ReturnDecision::AlreadyReturned,
        DeliveryStatus::No => ReturnDecision::NotDelivered,
    }
}
