//! Request payloads for order operations
//!
//! These are the shapes clients send. Prices are deliberately absent from
//! [`OrderLineInput`]: the engine always reads them from the catalog.

use super::types::{GuestInfo, ProofDecision};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One requested line of a new order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLineInput {
    pub product_id: String,
    pub quantity: i32,
}

/// Create-order request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CreateOrderInput {
    pub items: Vec<OrderLineInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_info: Option<GuestInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_token: Option<String>,
}

/// Set-status request (status arrives as free text and is validated server side)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetStatusInput {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Add-payment request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddPaymentInput {
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Upload-proof request (the file itself already lives in blob storage)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadProofInput {
    pub url: String,
    pub proof_type: String,
}

/// Review-proof request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewProofInput {
    pub decision: ProofDecision,
    /// Amount to credit to the ledger when approving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

/// Guest-claim request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimGuestOrdersInput {
    pub email: String,
}
