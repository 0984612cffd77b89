//! Order record - the persisted state of one order
//!
//! Items, payment ledger and proofs are embedded and written atomically with
//! the parent record. Money fields are always recomputable from the ledger
//! (see [`Order::recompute_money`]).

use super::types::{GuestInfo, OrderStatus, Ownership, PaymentStatus, ProofStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Item snapshot frozen at order creation
///
/// Never re-derived from the live catalog afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItemSnapshot {
    /// Product ID
    pub product_id: String,
    /// Product name at creation time
    pub name: String,
    /// Unit price at creation time
    pub unit_price: Decimal,
    /// Ordered quantity
    pub quantity: i32,
    /// Image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OrderItemSnapshot {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Ledger entry (immutable once appended)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentEntry {
    pub id: String,
    pub amount: Decimal,
    /// Unix millis
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Actor uid that recorded the payment
    pub recorded_by: String,
}

/// Uploaded payment evidence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentProof {
    pub id: String,
    /// Blob storage reference
    pub url: String,
    /// MIME type or free-form kind (e.g. "image/png", "bank_transfer")
    pub proof_type: String,
    pub status: ProofStatus,
    pub uploaded_by: String,
    pub uploaded_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<i64>,
}

/// Order record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Order ID (assigned by server)
    pub id: String,
    /// Caller-supplied token collapsing retried submissions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_token: Option<String>,
    /// Ownership (customer uid or guest)
    pub owner: Ownership,
    /// Contact info for guest checkouts (kept after a claim)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_info: Option<GuestInfo>,
    /// Frozen item snapshot
    pub items: Vec<OrderItemSnapshot>,

    // === Money ===
    /// Total frozen at creation
    pub total: Decimal,
    /// Sum of the ledger
    pub amount_paid: Decimal,
    /// `total - amount_paid`
    pub balance: Decimal,
    /// Derived from `balance`
    pub payment_status: PaymentStatus,
    /// Append-only payment ledger
    #[serde(default)]
    pub payments: Vec<PaymentEntry>,
    /// Uploaded payment proofs
    #[serde(default)]
    pub proofs: Vec<PaymentProof>,

    /// Order status
    pub status: OrderStatus,

    // === Audit ===
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
}

impl Order {
    /// Create a fresh pending, unpaid order
    pub fn new(
        id: String,
        owner: Ownership,
        guest_info: Option<GuestInfo>,
        items: Vec<OrderItemSnapshot>,
        idempotency_token: Option<String>,
        now: i64,
    ) -> Self {
        let total: Decimal = items.iter().map(OrderItemSnapshot::line_total).sum();
        let mut order = Self {
            id,
            idempotency_token,
            owner,
            guest_info,
            items,
            total,
            amount_paid: Decimal::ZERO,
            balance: total,
            payment_status: PaymentStatus::Unpaid,
            payments: Vec::new(),
            proofs: Vec::new(),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            updated_by: None,
            admin_note: None,
        };
        // a zero total is already paid
        order.recompute_money();
        order
    }

    /// Sum of all ledger entries
    pub fn ledger_sum(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Rebuild `amount_paid`, `balance` and `payment_status` from the ledger
    pub fn recompute_money(&mut self) {
        self.amount_paid = self.ledger_sum();
        self.balance = self.total - self.amount_paid;
        self.payment_status = PaymentStatus::derive(self.balance, self.amount_paid);
    }

    /// Check the money invariants against the ledger
    pub fn money_is_consistent(&self) -> bool {
        let paid = self.ledger_sum();
        self.amount_paid == paid
            && self.balance == self.total - paid
            && self.amount_paid <= self.total
            && self.payment_status == PaymentStatus::derive(self.balance, self.amount_paid)
    }

    pub fn owner_uid(&self) -> Option<&str> {
        self.owner.uid()
    }

    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner.uid() == Some(uid)
    }

    pub fn guest_email(&self) -> Option<&str> {
        self.guest_info.as_ref().map(|g| g.email.as_str())
    }

    /// Notification recipient: the owner if authenticated, otherwise the guest email
    pub fn recipient(&self) -> Option<String> {
        self.owner_uid()
            .map(str::to_string)
            .or_else(|| self.guest_email().map(str::to_string))
    }

    pub fn find_proof(&self, proof_id: &str) -> Option<&PaymentProof> {
        self.proofs.iter().find(|p| p.id == proof_id)
    }
}
