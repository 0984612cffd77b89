//! CreateOrder command handler
//!
//! Reserves stock, freezes the price snapshot and writes the order together
//! with its token and index entries. Idempotent replays are resolved by the
//! manager before this action runs.

use async_trait::async_trait;

use crate::orders::inventory;
use crate::orders::money::validate_line;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderChange, OrderError};
use shared::error::ErrorCode;
use shared::order::{GuestInfo, Order, OrderLineInput, Ownership};

/// CreateOrder action
#[derive(Debug, Clone)]
pub struct CreateOrderAction {
    /// Server-assigned ID of the new order
    pub order_id: String,
    pub owner: Ownership,
    pub lines: Vec<OrderLineInput>,
    pub guest_info: Option<GuestInfo>,
    /// Already validated by [`crate::orders::idempotency::validate_token`]
    pub idempotency_token: Option<String>,
}

#[async_trait]
impl CommandHandler for CreateOrderAction {
    fn validate(&self) -> Result<(), OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::validation(
                ErrorCode::OrderEmpty,
                "order must contain at least one item",
            ));
        }
        for line in &self.lines {
            validate_line(line)?;
        }

        if self.owner.is_guest() {
            let email_ok = self
                .guest_info
                .as_ref()
                .map(|g| g.email.trim())
                .is_some_and(|e| !e.is_empty() && e.contains('@'));
            if !email_ok {
                return Err(OrderError::validation(
                    ErrorCode::GuestInfoRequired,
                    "guest checkout requires contact info with a valid email",
                ));
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderChange>, OrderError> {
        let storage = ctx.storage();
        let txn = ctx.txn();

        // 1. Stock check + decrement + price snapshot
        let items = inventory::reserve(storage, txn, &self.lines)?;

        // 2. Build the order
        let mut guest_info = self.guest_info.clone();
        if let Some(info) = guest_info.as_mut() {
            info.email = shared::util::normalize_email(&info.email);
        }
        let mut order = Order::new(
            self.order_id.clone(),
            self.owner.clone(),
            guest_info,
            items,
            self.idempotency_token.clone(),
            metadata.timestamp,
        );
        if !metadata.actor_id.is_empty() {
            order.updated_by = Some(metadata.actor_id.clone());
        }

        // 3. Token + indexes in the same transaction
        if let Some(token) = &self.idempotency_token {
            crate::orders::idempotency::register(storage, txn, token, &order.id)?;
        }
        match &order.owner {
            Ownership::Customer { uid } => storage.add_owner_index(txn, uid, &order.id)?,
            Ownership::Guest => {
                if let Some(email) = order.guest_email() {
                    storage.add_guest_email_index(txn, email, &order.id)?;
                }
            }
        }

        let change = OrderChange::Created {
            order_id: order.id.clone(),
            total: order.total,
        };
        ctx.save_order(order);

        Ok(vec![change])
    }
}
