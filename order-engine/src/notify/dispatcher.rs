//! Post-commit notification dispatcher
//!
//! `dispatch()` never blocks the caller: requests go into a bounded queue
//! drained by [`super::NotificationWorker`]. A full or closed queue is logged
//! and written to the failure table, and the request is dropped.

use rust_decimal::Decimal;
use shared::order::{Order, PaymentProof, ProofStatus};
use tokio::sync::mpsc;

use super::types::{DispatchFailure, FailureStage, NotificationKind, NotificationRequest};
use crate::orders::storage::OrderStorage;

#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<NotificationRequest>,
    storage: OrderStorage,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Create the dispatcher and the receiver its worker drains
    pub fn new(
        storage: OrderStorage,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<NotificationRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, storage }, rx)
    }

    /// Enqueue a request (fire-and-forget)
    pub fn dispatch(&self, req: NotificationRequest) {
        if let Err(e) = self.tx.try_send(req) {
            let (reason, req) = match e {
                mpsc::error::TrySendError::Full(r) => ("queue full", r),
                mpsc::error::TrySendError::Closed(r) => ("worker stopped", r),
            };
            tracing::warn!(
                order_id = %req.order_id,
                kind = ?req.kind,
                reason,
                "Notification dropped"
            );
            let mut failure = DispatchFailure::new(FailureStage::Enqueue, &req, reason);
            if let Err(e) = self.storage.record_dispatch_failure(&mut failure) {
                tracing::error!(error = %e, "Failed to record dispatch failure");
            }
        }
    }

    /// Build and enqueue; orders without a resolvable recipient are skipped
    pub fn notify(&self, order: &Order, kind: NotificationKind) {
        match build_request(order, kind) {
            Some(req) => self.dispatch(req),
            None => {
                tracing::debug!(order_id = %order.id, "No notification recipient, skipping");
            }
        }
    }
}

/// Human-readable message for an order change
pub fn build_request(order: &Order, kind: NotificationKind) -> Option<NotificationRequest> {
    let recipient = order.recipient()?;
    let short_id = order.id.get(..8).unwrap_or(&order.id);

    let (title, body) = match kind {
        NotificationKind::OrderCreated => (
            format!("Order {} received", short_id),
            format!(
                "We received your order of {} item(s). Total due: {}.",
                order.items.iter().map(|i| i.quantity).sum::<i32>(),
                order.total.round_dp(2)
            ),
        ),
        NotificationKind::StatusChanged => {
            let mut body = format!("Your order is now {}.", order.status);
            if let Some(note) = &order.admin_note {
                body.push_str(&format!(" Note: {}", note));
            }
            (format!("Order {} updated", short_id), body)
        }
        NotificationKind::BalanceUpdated => (
            format!("Payment received for order {}", short_id),
            balance_body(order.amount_paid, order.balance),
        ),
        NotificationKind::ProofUploaded => (
            format!("Payment proof received for order {}", short_id),
            "Your payment proof was received and is waiting for review.".to_string(),
        ),
        NotificationKind::ProofReviewed => {
            let verdict = match latest_reviewed(order).map(|p| p.status) {
                Some(ProofStatus::Approved) => "approved",
                Some(ProofStatus::Rejected) => "rejected",
                _ => "reviewed",
            };
            (
                format!("Payment proof {} for order {}", verdict, short_id),
                format!("Your payment proof was {}.", verdict),
            )
        }
    };

    Some(NotificationRequest {
        recipient,
        order_id: order.id.clone(),
        kind,
        title,
        body,
    })
}

fn balance_body(amount_paid: Decimal, balance: Decimal) -> String {
    if balance <= Decimal::ZERO {
        format!("Paid in full ({}).", amount_paid.round_dp(2))
    } else {
        format!(
            "Paid so far: {}. Remaining balance: {}.",
            amount_paid.round_dp(2),
            balance.round_dp(2)
        )
    }
}

fn latest_reviewed(order: &Order) -> Option<&PaymentProof> {
    order
        .proofs
        .iter()
        .filter(|p| p.reviewed_at.is_some())
        .max_by_key(|p| p.reviewed_at)
}
