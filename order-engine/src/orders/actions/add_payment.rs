//! AddPayment command handler
//!
//! Appends one immutable ledger entry. Overpayment is refused outright (no
//! partial credit). Reaching a zero balance approves the order unless it was
//! already shipped or cancelled.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::orders::money::{apply_payment, validate_payment_amount};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderChange, OrderError};
use shared::order::{OrderStatus, PaymentEntry};

/// AddPayment action
#[derive(Debug, Clone)]
pub struct AddPaymentAction {
    pub order_id: String,
    pub amount: Decimal,
    pub note: Option<String>,
}

#[async_trait]
impl CommandHandler for AddPaymentAction {
    fn validate(&self) -> Result<(), OrderError> {
        validate_payment_amount(self.amount).map(|_| ())
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderChange>, OrderError> {
        // 1. Normalize amount (2dp, half-up)
        let amount = validate_payment_amount(self.amount)?;

        // 2. Load order
        let mut order = ctx.load_order(&self.order_id)?;

        // 3. Cancelled orders take no money
        if order.status == OrderStatus::Cancelled {
            return Err(OrderError::OrderCancelled(self.order_id.clone()));
        }

        // 4. Append to ledger (rejects overpayment, recomputes money fields)
        let entry = PaymentEntry {
            id: shared::util::new_id(),
            amount,
            timestamp: metadata.timestamp,
            note: self.note.clone(),
            recorded_by: metadata.actor_id.clone(),
        };
        let payment_id = entry.id.clone();
        apply_payment(&mut order, entry)?;

        // 5. Full payment implies approval unless the order already left
        let auto_approved = order.balance <= Decimal::ZERO
            && !matches!(
                order.status,
                OrderStatus::Cancelled | OrderStatus::Shipped | OrderStatus::Approved
            );
        if auto_approved {
            order.status = OrderStatus::Approved;
        }

        order.updated_at = metadata.timestamp;
        order.updated_by = Some(metadata.actor_id.clone());

        let change = OrderChange::PaymentAdded {
            order_id: self.order_id.clone(),
            payment_id,
            amount,
            balance: order.balance,
            auto_approved,
        };
        ctx.save_order(order);

        Ok(vec![change])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use shared::order::{Order, OrderItemSnapshot, Ownership, PaymentStatus};

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            actor_id: "admin-1".to_string(),
            timestamp: 1234567890,
        }
    }

    fn seed(storage: &OrderStorage, total: i64, status: OrderStatus) {
        let mut order = Order::new(
            "order-1".to_string(),
            Ownership::Guest,
            None,
            vec![OrderItemSnapshot {
                product_id: "p-1".to_string(),
                name: "Widget".to_string(),
                unit_price: Decimal::from(total),
                quantity: 1,
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

    fn pay(amount: i64) -> AddPaymentAction {
        AddPaymentAction {
            order_id: "order-1".to_string(),
            amount: Decimal::from(amount),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_partial_payment() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed(&storage, 200, OrderStatus::Pending);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        let changes = pay(80)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert!(matches!(
            &changes[0],
            OrderChange::PaymentAdded { auto_approved: false, balance, .. } if *balance == Decimal::from(120)
        ));
        let order = ctx.modified_orders().next().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Partial);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payments.len(), 1);
        assert_eq!(order.payments[0].recorded_by, "admin-1");
    }

    #[tokio::test]
    async fn test_full_payment_auto_approves() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed(&storage, 200, OrderStatus::PaymentReview);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        let changes = pay(200)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert!(matches!(
            changes[0],
            OrderChange::PaymentAdded { auto_approved: true, .. }
        ));
        let order = ctx.modified_orders().next().unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_full_payment_keeps_shipped() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed(&storage, 50, OrderStatus::Shipped);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        pay(50)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(
            ctx.modified_orders().next().unwrap().status,
            OrderStatus::Shipped
        );
    }

    #[tokio::test]
    async fn test_overpayment_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed(&storage, 100, OrderStatus::Pending);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        let err = pay(101)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Overpayment { .. }));
        assert_eq!(ctx.modified_orders().count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_order_rejects_payment() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed(&storage, 100, OrderStatus::Cancelled);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage);
        let err = pay(10)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::OrderCancelled(_)));
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        assert!(pay(0).validate().is_err());
        assert!(pay(-10).validate().is_err());
        assert!(pay(10).validate().is_ok());
    }
}
