//! Order Module
//!
//! Types for the order transaction & payment ledger engine:
//! - Record: the persisted order with embedded items, ledger and proofs
//! - Commands: request payloads sent by clients
//! - Types: statuses, ownership, guest info

pub mod command;
pub mod snapshot;
pub mod types;

// Re-exports
pub use command::{
    AddPaymentInput, ClaimGuestOrdersInput, CreateOrderInput, OrderLineInput, ReviewProofInput,
    SetStatusInput, UploadProofInput,
};
pub use snapshot::{Order, OrderItemSnapshot, PaymentEntry, PaymentProof};
pub use types::*;
