//! Order status state machine
//!
//! ```text
//!            ┌──────────────── any of ───────────────┐
//!  pending ⇄ payment_review ⇄ approved ──► shipped   │
//!     │            │              │  ◄──────┘         │
//!     └────────────┴──────────────┴──► cancelled (terminal)
//! ```
//!
//! `shipped` may only go back to `approved`; `cancelled` accepts nothing.
//! Writing the current status again is always allowed.

use super::traits::OrderError;
use shared::error::ErrorCode;
use shared::order::OrderStatus;

/// Whether `from -> to` is a legal transition
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    if from == to {
        return true;
    }
    match from {
        Pending | PaymentReview | Approved => true,
        Shipped => to == Approved,
        Cancelled => false,
    }
}

pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(OrderError::IllegalTransition { from, to })
    }
}

/// Parse a client-supplied status string
pub fn parse_status(raw: &str) -> Result<OrderStatus, OrderError> {
    raw.trim().parse::<OrderStatus>().map_err(|e| {
        OrderError::validation(
            ErrorCode::OrderInvalidStatus,
            format!("unrecognized order status: {}", e.0),
        )
    })
}

/// Whether moving to `to` has to put stock back
pub fn requires_restock(from: OrderStatus, to: OrderStatus) -> bool {
    to == OrderStatus::Cancelled && from != OrderStatus::Cancelled
}
