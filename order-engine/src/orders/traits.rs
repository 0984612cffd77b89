//! Command handler abstraction
//!
//! Every mutating order operation is an action implementing [`CommandHandler`].
//! The manager opens one redb write transaction, hands the action a
//! [`CommandContext`] bound to it, then persists the orders the action
//! touched and commits. Actions never commit.

use async_trait::async_trait;
use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::error::ErrorCode;
use shared::order::{Order, OrderStatus};
use std::collections::HashMap;
use thiserror::Error;

use super::storage::{OrderStorage, StorageError};

/// Who issued the command and when
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    /// Actor uid (empty for guest checkout)
    pub actor_id: String,
    /// Unix millis
    pub timestamp: i64,
}

/// Errors returned by actions
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{1}")]
    Validation(ErrorCode, String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Payment of {amount} exceeds remaining balance {balance}")]
    Overpayment { amount: Decimal, balance: Decimal },

    #[error("Order already cancelled: {0}")]
    OrderCancelled(String),

    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Proof not found: {0}")]
    ProofNotFound(String),

    #[error("Proof already reviewed: {0}")]
    ProofAlreadyReviewed(String),

    #[error("Proof limit reached ({0})")]
    ProofLimitReached(usize),

    #[error("Not the owner of order {0}")]
    NotOwner(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl OrderError {
    pub fn validation(code: ErrorCode, msg: impl Into<String>) -> Self {
        OrderError::Validation(code, msg.into())
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            OrderError::Validation(code, _) => *code,
            OrderError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            OrderError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            OrderError::InsufficientStock { .. } => ErrorCode::ProductOutOfStock,
            OrderError::Overpayment { .. } => ErrorCode::PaymentExceedsBalance,
            OrderError::OrderCancelled(_) => ErrorCode::OrderAlreadyCancelled,
            OrderError::IllegalTransition { .. } => ErrorCode::OrderIllegalTransition,
            OrderError::ProofNotFound(_) => ErrorCode::ProofNotFound,
            OrderError::ProofAlreadyReviewed(_) => ErrorCode::ProofAlreadyReviewed,
            OrderError::ProofLimitReached(_) => ErrorCode::ProofLimitReached,
            OrderError::NotOwner(_) => ErrorCode::NotOrderOwner,
            OrderError::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

/// Transaction-scoped view handed to actions
///
/// Orders loaded through the context are cached; `save_order` marks them
/// modified so the manager persists them before commit.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a OrderStorage,
    orders: HashMap<String, Order>,
    modified: Vec<String>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a OrderStorage) -> Self {
        Self {
            txn,
            storage,
            orders: HashMap::new(),
            modified: Vec::new(),
        }
    }

    pub fn txn(&self) -> &'a WriteTransaction {
        self.txn
    }

    pub fn storage(&self) -> &'a OrderStorage {
        self.storage
    }

    /// Load an order (context cache first, then the transaction)
    pub fn load_order(&mut self, order_id: &str) -> Result<Order, OrderError> {
        if let Some(order) = self.orders.get(order_id) {
            return Ok(order.clone());
        }
        let order = self
            .storage
            .get_order_txn(self.txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        self.orders.insert(order_id.to_string(), order.clone());
        Ok(order)
    }

    /// Stage an order for persistence
    pub fn save_order(&mut self, order: Order) {
        if !self.modified.contains(&order.id) {
            self.modified.push(order.id.clone());
        }
        self.orders.insert(order.id.clone(), order);
    }

    /// Orders staged with `save_order`, in first-save order
    pub fn modified_orders(&self) -> impl Iterator<Item = &Order> {
        self.modified.iter().filter_map(|id| self.orders.get(id))
    }
}

/// One order operation
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Input checks that need no storage; run before the transaction opens
    fn validate(&self) -> Result<(), OrderError> {
        Ok(())
    }

    /// Perform the operation inside the context's transaction
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderChange>, OrderError>;
}

/// What an action did, used for audit and notifications after commit
#[derive(Debug, Clone, PartialEq)]
pub enum OrderChange {
    Created {
        order_id: String,
        total: Decimal,
    },
    StatusChanged {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
        restocked: bool,
    },
    PaymentAdded {
        order_id: String,
        payment_id: String,
        amount: Decimal,
        balance: Decimal,
        auto_approved: bool,
    },
    ProofUploaded {
        order_id: String,
        proof_id: String,
        moved_to_review: bool,
    },
    ProofReviewed {
        order_id: String,
        proof_id: String,
        status: shared::order::ProofStatus,
    },
    ProofReviewReverted {
        order_id: String,
        proof_id: String,
    },
}

impl OrderChange {
    pub fn order_id(&self) -> &str {
        match self {
            OrderChange::Created { order_id, .. }
            | OrderChange::StatusChanged { order_id, .. }
            | OrderChange::PaymentAdded { order_id, .. }
            | OrderChange::ProofUploaded { order_id, .. }
            | OrderChange::ProofReviewed { order_id, .. }
            | OrderChange::ProofReviewReverted { order_id, .. } => order_id,
        }
    }
}
