//! Enumerations and small value types for orders

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Order Status
// ============================================================================

/// Order status
///
/// `Cancelled` is terminal: no outgoing transitions exist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    PaymentReview,
    Approved,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::PaymentReview,
        OrderStatus::Approved,
        OrderStatus::Shipped,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentReview => "payment_review",
            OrderStatus::Approved => "approved",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized status string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

// ============================================================================
// Payment Status
// ============================================================================

/// Payment status - always derived from the ledger, never set directly
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// `balance <= 0` ⇒ paid, otherwise partial once anything was paid
    pub fn derive(balance: Decimal, amount_paid: Decimal) -> Self {
        if balance <= Decimal::ZERO {
            PaymentStatus::Paid
        } else if amount_paid > Decimal::ZERO {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }
}

// ============================================================================
// Payment Proofs
// ============================================================================

/// Review status of an uploaded payment proof
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    #[default]
    PendingReview,
    Approved,
    Rejected,
}

/// Reviewer decision on a proof
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProofDecision {
    Approved,
    Rejected,
}

impl From<ProofDecision> for ProofStatus {
    fn from(decision: ProofDecision) -> Self {
        match decision {
            ProofDecision::Approved => ProofStatus::Approved,
            ProofDecision::Rejected => ProofStatus::Rejected,
        }
    }
}

// ============================================================================
// Ownership
// ============================================================================

/// Who owns an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ownership {
    /// Authenticated customer (identity provider uid)
    Customer { uid: String },
    /// Anonymous checkout, identified by the embedded guest info
    Guest,
}

impl Ownership {
    pub fn uid(&self) -> Option<&str> {
        match self {
            Ownership::Customer { uid } => Some(uid.as_str()),
            Ownership::Guest => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Ownership::Guest)
    }
}

/// Contact info captured for guest checkouts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GuestInfo {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}
