//! OrdersManager - Core command processing
//!
//! This module handles:
//! - Authorization and input validation (before any transaction)
//! - Command execution inside one redb write transaction
//! - Persistence of the orders an action touched
//! - Post-commit audit entries and notifications
//!
//! # Command Flow
//!
//! ```text
//! process_command(action)
//!     ├─ 1. Validate input (no storage access)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Create CommandContext
//!     ├─ 4. Execute action (reads + writes through the transaction)
//!     ├─ 5. Persist modified orders
//!     ├─ 6. Commit transaction
//!     └─ 7. Publish audit entries + notifications (caller decides)
//! ```
//!
//! All methods are synchronous; async callers run them on
//! `tokio::task::spawn_blocking`.

mod error;
pub use error::*;

use super::actions::{
    AddPaymentAction, CommandAction, CreateOrderAction, ReviewProofAction,
    RevertProofReviewAction, SetStatusAction, UploadProofAction,
};
use super::claim::{CLAIM_BATCH_SIZE, claim_batch};
use super::idempotency;
use super::money::{round_money, validate_payment_amount};
use super::status::parse_status;
use super::storage::{OrderStorage, StorageError};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, OrderChange, OrderError};
use crate::audit::{AuditAction, AuditService, AuditTrail, verify_chain};
use crate::auth::CurrentUser;
use crate::notify::{
    DispatchFailure, Notification, NotificationDispatcher, NotificationKind,
    NotificationPreference,
};
use redb::WriteTransaction;
use rust_decimal::Decimal;
use serde_json::json;
use shared::error::ErrorCode;
use shared::models::Product;
use shared::order::{
    CreateOrderInput, Order, OrderStatus, Ownership, PaymentProof, ProofDecision, ProofStatus,
    UploadProofInput,
};
use std::sync::Arc;

/// Result of one committed command
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Orders written by the command
    pub orders: Vec<Order>,
    pub changes: Vec<OrderChange>,
}

impl CommandOutcome {
    fn into_order(self) -> ManagerResult<Order> {
        self.orders
            .into_iter()
            .next()
            .ok_or_else(|| ManagerError::Internal("command wrote no order".to_string()))
    }
}

/// OrdersManager for command processing
pub struct OrdersManager {
    storage: OrderStorage,
    audit: Arc<AuditService>,
    notifier: NotificationDispatcher,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<OrderStorage>")
            .field("notifier", &self.notifier)
            .finish()
    }
}

impl OrdersManager {
    pub fn new(
        storage: OrderStorage,
        audit: Arc<AuditService>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            storage,
            audit,
            notifier,
        }
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    fn metadata(actor_id: &str) -> CommandMetadata {
        CommandMetadata {
            command_id: shared::util::new_id(),
            actor_id: actor_id.to_string(),
            timestamp: shared::util::now_millis(),
        }
    }

    fn require_admin(actor: &CurrentUser) -> ManagerResult<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            crate::security_log!("WARN", "admin_required", user_id = actor.id.clone());
            Err(ManagerError::forbidden(
                ErrorCode::AdminRequired,
                "Administrator role required",
            ))
        }
    }

    // ========== Command processing ==========

    /// Validate, execute in a fresh transaction, persist and commit
    ///
    /// Publishing side effects is left to the caller.
    fn process_command(
        &self,
        action: CommandAction,
        metadata: &CommandMetadata,
    ) -> ManagerResult<CommandOutcome> {
        tracing::debug!(command_id = %metadata.command_id, action = action.name(), "Processing command");

        // 1. Validation happens before the transaction opens
        action.validate()?;

        // 2. Begin write transaction
        let txn = self.storage.begin_write()?;
        self.execute_in(txn, &action, metadata)
    }

    /// Execute `action` inside `txn` and commit
    ///
    /// Dropping `txn` on any error path aborts every write the action made.
    fn execute_in(
        &self,
        txn: WriteTransaction,
        action: &CommandAction,
        metadata: &CommandMetadata,
    ) -> ManagerResult<CommandOutcome> {
        let (orders, changes) = {
            // 3. Create context
            let mut ctx = CommandContext::new(&txn, &self.storage);

            // 4. Execute action
            let changes = futures::executor::block_on(action.execute(&mut ctx, metadata))
                .map_err(|e| {
                    tracing::warn!(
                        command_id = %metadata.command_id,
                        action = action.name(),
                        error = %e,
                        "Command rejected"
                    );
                    ManagerError::from(e)
                })?;

            // 5. Persist modified orders
            let orders: Vec<Order> = ctx.modified_orders().cloned().collect();
            for order in &orders {
                debug_assert!(order.money_is_consistent(), "ledger invariant broken");
                self.storage.store_order(&txn, order)?;
            }
            (orders, changes)
        };

        // 6. Commit transaction
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            command_id = %metadata.command_id,
            action = action.name(),
            order_ids = ?orders.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
            "Command processed successfully"
        );
        Ok(CommandOutcome { orders, changes })
    }

    /// Post-commit side channel: audit entries always, notifications optionally
    fn publish(&self, outcome: &CommandOutcome, metadata: &CommandMetadata, notify: bool) {
        for change in &outcome.changes {
            let (action, details, kind) = describe(change);
            self.audit.log(
                change.order_id(),
                action,
                Some(metadata.actor_id.clone()).filter(|a| !a.is_empty()),
                details,
            );

            if !notify {
                continue;
            }
            let Some(kind) = kind else { continue };
            if let Some(order) = outcome.orders.iter().find(|o| o.id == change.order_id()) {
                self.notifier.notify(order, kind);
            }
        }
    }

    // ========== Order operations ==========

    /// Create an order (guest checkout when `identity` is `None`)
    ///
    /// A repeated idempotency token returns the originally created order
    /// without touching stock or dispatching anything.
    pub fn create_order(
        &self,
        identity: Option<&CurrentUser>,
        input: CreateOrderInput,
    ) -> ManagerResult<Order> {
        let token = idempotency::validate_token(input.idempotency_token.as_deref())?;
        let owner = match identity {
            Some(user) => Ownership::Customer {
                uid: user.id.clone(),
            },
            None => Ownership::Guest,
        };
        let action = CreateOrderAction {
            order_id: shared::util::new_id(),
            owner: owner.clone(),
            lines: input.items,
            guest_info: input.guest_info,
            idempotency_token: token.clone(),
        };
        action.validate()?;

        let metadata = Self::metadata(identity.map(|u| u.id.as_str()).unwrap_or(""));
        let txn = self.storage.begin_write()?;

        // Idempotency check inside the creating transaction
        if let Some(token) = &token
            && let Some(existing) = idempotency::find_existing(&self.storage, &txn, token)?
        {
            if existing.owner != owner {
                crate::security_log!("WARN", "idempotency_token_reuse", order_id = existing.id.clone());
                return Err(OrderError::validation(
                    ErrorCode::IdempotencyTokenInvalid,
                    "idempotency token already used by another caller",
                )
                .into());
            }
            tracing::warn!(order_id = %existing.id, "Duplicate order submission, returning existing order");
            return Ok(existing);
        }

        let outcome = self.execute_in(txn, &CommandAction::CreateOrder(action), &metadata)?;
        self.publish(&outcome, &metadata, true);
        outcome.into_order()
    }

    /// Admin: move an order to `status`
    pub fn set_order_status(
        &self,
        order_id: &str,
        status: &str,
        note: Option<String>,
        actor: &CurrentUser,
    ) -> ManagerResult<Order> {
        Self::require_admin(actor)?;
        let status = parse_status(status)?;

        let metadata = Self::metadata(&actor.id);
        let outcome = self.process_command(
            SetStatusAction {
                order_id: order_id.to_string(),
                status,
                note,
            }
            .into(),
            &metadata,
        )?;
        self.publish(&outcome, &metadata, true);
        outcome.into_order()
    }

    /// Admin: record a payment against the ledger
    pub fn add_payment(
        &self,
        order_id: &str,
        amount: Decimal,
        note: Option<String>,
        actor: &CurrentUser,
    ) -> ManagerResult<Order> {
        Self::require_admin(actor)?;

        let metadata = Self::metadata(&actor.id);
        let outcome = self.process_command(
            AddPaymentAction {
                order_id: order_id.to_string(),
                amount,
                note,
            }
            .into(),
            &metadata,
        )?;
        self.publish(&outcome, &metadata, true);
        outcome.into_order()
    }

    /// Owner (or admin): attach payment evidence
    pub fn upload_proof(
        &self,
        order_id: &str,
        input: UploadProofInput,
        actor: &CurrentUser,
    ) -> ManagerResult<PaymentProof> {
        let proof_id = shared::util::new_id();
        let metadata = Self::metadata(&actor.id);
        let outcome = self.process_command(
            UploadProofAction {
                order_id: order_id.to_string(),
                proof_id: proof_id.clone(),
                url: input.url,
                proof_type: input.proof_type,
                is_admin: actor.is_admin(),
            }
            .into(),
            &metadata,
        )?;
        self.publish(&outcome, &metadata, true);

        let order = outcome.into_order()?;
        order
            .find_proof(&proof_id)
            .cloned()
            .ok_or_else(|| ManagerError::Internal("uploaded proof missing".to_string()))
    }

    /// Admin: approve or reject a proof, optionally crediting the ledger
    ///
    /// The review and the credit are two transactions. If the credit fails,
    /// the proof is put back to `pending_review` and the ledger error is
    /// returned.
    pub fn review_proof(
        &self,
        order_id: &str,
        proof_id: &str,
        decision: ProofDecision,
        amount: Option<Decimal>,
        actor: &CurrentUser,
    ) -> ManagerResult<Order> {
        Self::require_admin(actor)?;

        // Credit amount is validated up front so a bad amount never reviews
        let credit = match (decision, amount) {
            (ProofDecision::Approved, Some(a)) if a > Decimal::ZERO => {
                Some(validate_payment_amount(a)?)
            }
            (_, Some(a)) if a < Decimal::ZERO => {
                return Err(OrderError::validation(
                    ErrorCode::PaymentInvalidAmount,
                    format!("credit amount must not be negative, got {}", a),
                )
                .into());
            }
            _ => None,
        };

        // 1. Review (proof must still be pending_review)
        let metadata = Self::metadata(&actor.id);
        let reviewed = self.process_command(
            ReviewProofAction {
                order_id: order_id.to_string(),
                proof_id: proof_id.to_string(),
                decision,
            }
            .into(),
            &metadata,
        )?;

        let Some(amount) = credit else {
            self.publish(&reviewed, &metadata, true);
            return reviewed.into_order();
        };

        // 2. Credit the ledger
        let payment_meta = Self::metadata(&actor.id);
        let payment = self.process_command(
            AddPaymentAction {
                order_id: order_id.to_string(),
                amount,
                note: Some(format!("proof {}", proof_id)),
            }
            .into(),
            &payment_meta,
        );

        match payment {
            Ok(paid) => {
                self.publish(&reviewed, &metadata, true);
                self.publish(&paid, &payment_meta, true);
                paid.into_order()
            }
            Err(ledger_err) => {
                // 3. Compensate: proof back to its pre-review status
                self.publish(&reviewed, &metadata, false);
                let revert_meta = Self::metadata(&actor.id);
                match self.process_command(
                    RevertProofReviewAction {
                        order_id: order_id.to_string(),
                        proof_id: proof_id.to_string(),
                        previous: ProofStatus::PendingReview,
                    }
                    .into(),
                    &revert_meta,
                ) {
                    Ok(reverted) => self.publish(&reverted, &revert_meta, false),
                    Err(e) => {
                        tracing::error!(
                            order_id = %order_id,
                            proof_id = %proof_id,
                            error = %e,
                            "Failed to revert proof review after ledger failure"
                        );
                    }
                }
                Err(ledger_err)
            }
        }
    }

    /// Claim every unclaimed guest order placed with `email`
    ///
    /// Returns the number of orders claimed by this call.
    pub fn claim_guest_orders(&self, identity: &CurrentUser, email: &str) -> ManagerResult<usize> {
        if !identity.email_verified {
            return Err(ManagerError::forbidden(
                ErrorCode::EmailNotVerified,
                "Email address must be verified before claiming orders",
            ));
        }
        let key = shared::util::normalize_email(email);
        let verified = identity
            .email
            .as_deref()
            .map(shared::util::normalize_email)
            .unwrap_or_default();
        if verified.is_empty() || key != verified {
            crate::security_log!("WARN", "claim_email_mismatch", user_id = identity.id.clone());
            return Err(ManagerError::forbidden(
                ErrorCode::EmailMismatch,
                "Claimed email does not match the verified email",
            ));
        }

        let candidates = self.storage.get_guest_order_ids_by_email(&key)?;
        let mut total = 0;

        for batch in candidates.chunks(CLAIM_BATCH_SIZE) {
            let claimed = claim_batch(
                &self.storage,
                &identity.id,
                &key,
                batch,
                shared::util::now_millis(),
            )?;
            for order in &claimed {
                self.audit.log(
                    &order.id,
                    AuditAction::OrderClaimed,
                    Some(identity.id.clone()),
                    json!({ "uid": identity.id }),
                );
            }
            total += claimed.len();
        }

        tracing::info!(user_id = %identity.id, claimed = total, "Guest orders claimed");
        Ok(total)
    }

    /// Admin: create or replace a catalog product
    pub fn upsert_product(&self, product: Product, actor: &CurrentUser) -> ManagerResult<Product> {
        Self::require_admin(actor)?;
        if product.id.trim().is_empty() || product.name.trim().is_empty() {
            return Err(OrderError::validation(
                ErrorCode::RequiredField,
                "product id and name are required",
            )
            .into());
        }
        if product.price < Decimal::ZERO {
            return Err(OrderError::validation(
                ErrorCode::ProductInvalidPrice,
                format!("price must not be negative, got {}", product.price),
            )
            .into());
        }
        if round_money(product.price) != product.price {
            return Err(OrderError::validation(
                ErrorCode::ProductInvalidPrice,
                format!("price must have at most 2 decimal places, got {}", product.price),
            )
            .into());
        }
        if product.stock < 0 {
            return Err(OrderError::validation(
                ErrorCode::ValueOutOfRange,
                format!("stock must not be negative, got {}", product.stock),
            )
            .into());
        }
        self.storage.upsert_product(&product)?;
        tracing::info!(product_id = %product.id, stock = product.stock, "Product upserted");
        Ok(product)
    }

    // ========== Queries ==========

    /// Read one order; non-owners get `OrderNotFound`
    pub fn fetch_order(&self, order_id: &str, requester: &CurrentUser) -> ManagerResult<Order> {
        match self.storage.get_order(order_id)? {
            Some(order) if requester.is_admin() || order.is_owned_by(&requester.id) => Ok(order),
            _ => Err(OrderError::OrderNotFound(order_id.to_string()).into()),
        }
    }

    /// Orders owned by `owner_id`, newest first
    pub fn list_orders_for_owner(
        &self,
        owner_id: &str,
        requester: &CurrentUser,
    ) -> ManagerResult<Vec<Order>> {
        if !requester.is_admin() && requester.id != owner_id {
            return Err(ManagerError::forbidden(
                ErrorCode::PermissionDenied,
                "Cannot list another user's orders",
            ));
        }

        let mut orders = Vec::new();
        for id in self.storage.get_order_ids_for_owner(owner_id)? {
            match self.storage.get_order(&id)? {
                // 认领或迁移后索引可能残留，按订单当前归属过滤
                Some(order) if order.is_owned_by(owner_id) => orders.push(order),
                _ => {}
            }
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Admin: all orders, optionally filtered by status, newest first
    pub fn list_orders(
        &self,
        requester: &CurrentUser,
        status: Option<OrderStatus>,
    ) -> ManagerResult<Vec<Order>> {
        Self::require_admin(requester)?;
        let mut orders: Vec<Order> = self
            .storage
            .get_all_orders()?
            .into_iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Admin: audit trail of one order with chain verification
    pub fn list_audit_events(
        &self,
        order_id: &str,
        requester: &CurrentUser,
    ) -> ManagerResult<AuditTrail> {
        Self::require_admin(requester)?;
        let events = self.storage.get_audit_events(order_id)?;
        let verification = verify_chain(order_id, &events);
        if !verification.chain_intact {
            tracing::error!(order_id = %order_id, first_break = ?verification.first_break, "Audit chain broken");
        }
        Ok(AuditTrail {
            events,
            verification,
        })
    }

    // ========== Notifications ==========

    /// Notifications for the requester (uid, plus verified email for guest orders)
    pub fn list_notifications(&self, requester: &CurrentUser) -> ManagerResult<Vec<Notification>> {
        let mut notifications = self.storage.get_notifications(&requester.id)?;
        if requester.email_verified
            && let Some(email) = requester.email.as_deref()
        {
            let email = shared::util::normalize_email(email);
            notifications.extend(self.storage.get_notifications(&email)?);
        }
        notifications.sort_by_key(|n| n.seq);
        Ok(notifications)
    }

    pub fn set_notification_preference(
        &self,
        requester: &CurrentUser,
        opt_in_external: bool,
    ) -> ManagerResult<NotificationPreference> {
        let pref = NotificationPreference {
            recipient: requester.id.clone(),
            opt_in_external,
            updated_at: shared::util::now_millis(),
        };
        self.storage.set_notification_preference(&pref)?;
        Ok(pref)
    }

    /// Admin: the dispatcher's failure log
    pub fn list_notification_failures(
        &self,
        requester: &CurrentUser,
    ) -> ManagerResult<Vec<DispatchFailure>> {
        Self::require_admin(requester)?;
        Ok(self.storage.get_dispatch_failures()?)
    }
}

/// Audit action, details and notification kind for a change
fn describe(change: &OrderChange) -> (AuditAction, serde_json::Value, Option<NotificationKind>) {
    match change {
        OrderChange::Created { total, .. } => (
            AuditAction::OrderCreated,
            json!({ "total": total.to_string() }),
            Some(NotificationKind::OrderCreated),
        ),
        OrderChange::StatusChanged {
            from,
            to,
            restocked,
            ..
        } => (
            AuditAction::OrderStatusChanged,
            json!({ "from": from, "to": to, "restocked": restocked }),
            Some(NotificationKind::StatusChanged),
        ),
        OrderChange::PaymentAdded {
            payment_id,
            amount,
            balance,
            auto_approved,
            ..
        } => (
            AuditAction::OrderPaymentAdded,
            json!({
                "payment_id": payment_id,
                "amount": amount.to_string(),
                "balance": balance.to_string(),
                "auto_approved": auto_approved,
            }),
            Some(NotificationKind::BalanceUpdated),
        ),
        OrderChange::ProofUploaded {
            proof_id,
            moved_to_review,
            ..
        } => (
            AuditAction::ProofUploaded,
            json!({ "proof_id": proof_id, "moved_to_review": moved_to_review }),
            Some(NotificationKind::ProofUploaded),
        ),
        OrderChange::ProofReviewed {
            proof_id, status, ..
        } => (
            AuditAction::ProofReviewed,
            json!({ "proof_id": proof_id, "status": status }),
            Some(NotificationKind::ProofReviewed),
        ),
        OrderChange::ProofReviewReverted { proof_id, .. } => (
            AuditAction::ProofReviewReverted,
            json!({ "proof_id": proof_id }),
            None,
        ),
    }
}

#[cfg(test)]
mod tests;
