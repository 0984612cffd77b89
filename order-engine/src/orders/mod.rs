//! Order Transaction & Payment Ledger
//!
//! - **manager**: OrdersManager, authorization + command processing
//! - **actions**: one `CommandHandler` per order operation
//! - **storage**: redb persistence for orders, catalog, indexes and side logs
//! - **inventory** / **money** / **status**: the rules actions are built from
//! - **claim**: guest order claim in batches
//!
//! # Architecture
//!
//! ```text
//! HTTP handler → spawn_blocking → OrdersManager
//!                                   ├─ validate
//!                                   ├─ redb write txn ─ action.execute ─ commit
//!                                   └─ after commit:
//!                                        ├─ AuditService  (hash chain)
//!                                        └─ NotificationDispatcher
//! ```
//!
//! Stock, ledger and status changes of one operation either all commit or
//! none do. Audit and notification never affect the operation's result.

pub mod actions;
pub mod claim;
pub mod idempotency;
pub mod inventory;
pub mod manager;
pub mod money;
pub mod status;
pub mod storage;
pub mod traits;

// Re-exports
pub use manager::{CommandOutcome, ErrorKind, ManagerError, ManagerResult, OrdersManager};
pub use storage::{OrderStorage, StorageError};
pub use traits::{CommandContext, CommandHandler, CommandMetadata, OrderChange, OrderError};

// Re-export shared types for convenience
pub use shared::order::{Order, OrderStatus, PaymentStatus, ProofStatus};
