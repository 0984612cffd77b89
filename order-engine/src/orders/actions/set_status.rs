//! SetStatus command handler
//!
//! Moves an order through the state machine. The first transition into
//! `cancelled` restores stock in the same transaction; the status read that
//! guards it comes from the same transaction, so concurrent cancels restore
//! at most once.

use async_trait::async_trait;

use crate::orders::inventory;
use crate::orders::status::{ensure_transition, requires_restock};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderChange, OrderError};
use shared::order::OrderStatus;

/// SetStatus action
#[derive(Debug, Clone)]
pub struct SetStatusAction {
    pub order_id: String,
    /// Already parsed with [`crate::orders::status::parse_status`]
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[async_trait]
impl CommandHandler for SetStatusAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderChange>, OrderError> {
        let mut order = ctx.load_order(&self.order_id)?;
        let previous = order.status;

        ensure_transition(previous, self.status)?;

        let restocked = requires_restock(previous, self.status);
        if restocked {
            inventory::restore(ctx.storage(), ctx.txn(), &order.items)?;
        }

        order.status = self.status;
        if self.note.is_some() {
            order.admin_note = self.note.clone();
        }
        order.updated_at = metadata.timestamp;
        order.updated_by = Some(metadata.actor_id.clone());
        ctx.save_order(order);

        Ok(vec![OrderChange::StatusChanged {
            order_id: self.order_id.clone(),
            from: previous,
            to: self.status,
            restocked,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use rust_decimal::Decimal;
    use shared::models::Product;
    use shared::order::{Order, OrderItemSnapshot, Ownership};

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            actor_id: "admin-1".to_string(),
            timestamp: 1234567890,
        }
    }

    fn seed(storage: &OrderStorage, status: OrderStatus) {
        storage
            .upsert_product(&Product::new("p-1", "Widget", Decimal::from(100), 3))
            .unwrap();
        let mut order = Order::new(
            "order-1".to_string(),
            Ownership::Guest,
            None,
            vec![OrderItemSnapshot {
                product_id: "p-1".to_string(),
                name: "Widget".to_string(),
                unit_price: Decimal::from(100),
                quantity: 2,
                image: None,
            }],
            None,
            0,
        );
        order.status = status;
        let txn = storage.begin_write().unwrap();
        storage.store_order(&txn, &order).unwrap();
        txn.commit().unwrap();
    }

    fn set(status: OrderStatus) -> SetStatusAction {
        SetStatusAction {
            order_id: "order-1".to_string(),
            status,
            note: Some("checked".to_string()),
        }
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed(&storage, OrderStatus::Pending);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        let changes = set(OrderStatus::Cancelled)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert!(matches!(
            changes[0],
            OrderChange::StatusChanged { restocked: true, .. }
        ));
        let order = ctx.modified_orders().next().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.admin_note.as_deref(), Some("checked"));
        assert_eq!(order.updated_by.as_deref(), Some("admin-1"));
        assert_eq!(storage.get_product_txn(&txn, "p-1").unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_cancel_of_cancelled_does_not_restock() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed(&storage, OrderStatus::Cancelled);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        let changes = set(OrderStatus::Cancelled)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert!(matches!(
            changes[0],
            OrderChange::StatusChanged { restocked: false, .. }
        ));
        assert_eq!(storage.get_product_txn(&txn, "p-1").unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_non_cancel_transition_never_touches_stock() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed(&storage, OrderStatus::Pending);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        set(OrderStatus::Approved)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(storage.get_product_txn(&txn, "p-1").unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed(&storage, OrderStatus::Shipped);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        let err = set(OrderStatus::Cancelled)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::IllegalTransition { .. }));
        assert_eq!(ctx.modified_orders().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_order() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);

        let err = set(OrderStatus::Approved)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));
    }
}
