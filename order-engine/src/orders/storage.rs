//! redb-based storage layer for the order engine
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Order record with embedded items, ledger, proofs |
//! | `products` | `product_id` | `Product` (JSON) | Catalog stock/price read by the coordinator |
//! | `idempotency_tokens` | `token` | `order_id` | Collapses retried creations |
//! | `owner_orders` | `(uid, order_id)` | `()` | Per-owner index |
//! | `guest_email_orders` | `(email, order_id)` | `()` | Unclaimed guest orders by contact email |
//! | `audit_events` | `(order_id, seq)` | `OrderAuditEvent` (JSON) | Append-only, hash-chained |
//! | `notifications` | `(recipient, seq)` | `Notification` (JSON) | Durable notification records |
//! | `notification_preferences` | `recipient` | `NotificationPreference` (JSON) | External delivery opt-in |
//! | `notification_failures` | `seq` | `DispatchFailure` (JSON) | Dispatcher failure log |
//! | `sequence_counter` | name | `u64` | Counters |
//!
//! # Isolation
//!
//! redb allows a single write transaction at a time and gives readers a
//! consistent snapshot, so every read performed through a `WriteTransaction`
//! is serializable with respect to the writes in that same transaction.
//! Dropping an uncommitted `WriteTransaction` aborts it.

use crate::audit::types::{AuditAction, OrderAuditEvent, compute_audit_hash, GENESIS_HASH};
use crate::notify::types::{DispatchFailure, Notification, NotificationPreference};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::models::Product;
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Table for catalog products: key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// Table for idempotency tokens: key = token, value = order_id
const IDEMPOTENCY_TABLE: TableDefinition<&str, &str> = TableDefinition::new("idempotency_tokens");

/// Owner index: key = (owner uid, order_id)
const OWNER_ORDERS_TABLE: TableDefinition<(&str, &str), ()> = TableDefinition::new("owner_orders");

/// Unclaimed guest orders: key = (normalized email, order_id)
const GUEST_EMAIL_ORDERS_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("guest_email_orders");

/// Audit trail: key = (order_id, seq), value = JSON-serialized OrderAuditEvent
const AUDIT_EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("audit_events");

/// Notifications: key = (recipient, seq)
const NOTIFICATIONS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("notifications");

/// Notification preferences: key = recipient
const NOTIFICATION_PREFS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("notification_preferences");

/// Dispatcher failure log: key = seq
const NOTIFICATION_FAILURES_TABLE: TableDefinition<u64, &[u8]> =
    TableDefinition::new("notification_failures");

/// Counters: key = counter name
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const NOTIFICATION_SEQ_KEY: &str = "notification_seq";
const FAILURE_SEQ_KEY: &str = "failure_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order storage backed by redb
///
/// Cheap to clone; every clone shares the same database handle.
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb uses `Durability::Immediate` by default: commits are persistent
    /// as soon as `commit()` returns.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(IDEMPOTENCY_TABLE)?;
            let _ = write_txn.open_table(OWNER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(GUEST_EMAIL_ORDERS_TABLE)?;
            let _ = write_txn.open_table(AUDIT_EVENTS_TABLE)?;
            let _ = write_txn.open_table(NOTIFICATIONS_TABLE)?;
            let _ = write_txn.open_table(NOTIFICATION_PREFS_TABLE)?;
            let _ = write_txn.open_table(NOTIFICATION_FAILURES_TABLE)?;
            let _ = write_txn.open_table(SEQUENCE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    fn next_counter(txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table.get(key)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    // ========== Orders ==========

    /// Store an order (within transaction)
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => {
                let order: Order = serde_json::from_slice(value.value())?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Get an order by ID (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => {
                let order: Order = serde_json::from_slice(value.value())?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Get all orders
    pub fn get_all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            orders.push(order);
        }
        Ok(orders)
    }

    /// Number of stored orders
    pub fn order_count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Idempotency Tokens ==========

    /// Look up the order created under a token (within transaction)
    pub fn find_order_id_by_token_txn(
        &self,
        txn: &WriteTransaction,
        token: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(IDEMPOTENCY_TABLE)?;
        let order_id = table.get(token)?.map(|guard| guard.value().to_string());
        Ok(order_id)
    }

    /// Bind a token to an order (within transaction)
    pub fn register_token(
        &self,
        txn: &WriteTransaction,
        token: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(IDEMPOTENCY_TABLE)?;
        table.insert(token, order_id)?;
        Ok(())
    }

    // ========== Ownership Indexes ==========

    /// Index an order under its owner (within transaction)
    pub fn add_owner_index(
        &self,
        txn: &WriteTransaction,
        uid: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(OWNER_ORDERS_TABLE)?;
        table.insert((uid, order_id), ())?;
        Ok(())
    }

    /// Order IDs owned by `uid`
    pub fn get_order_ids_for_owner(&self, uid: &str) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OWNER_ORDERS_TABLE)?;

        let mut ids = Vec::new();
        for result in table.range((uid, "")..)? {
            let (key, _value) = result?;
            let (owner, order_id) = key.value();
            if owner != uid {
                break;
            }
            ids.push(order_id.to_string());
        }
        Ok(ids)
    }

    /// Index an unclaimed guest order under its contact email (within transaction)
    pub fn add_guest_email_index(
        &self,
        txn: &WriteTransaction,
        email: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(GUEST_EMAIL_ORDERS_TABLE)?;
        table.insert((email, order_id), ())?;
        Ok(())
    }

    /// Drop a guest email index entry (within transaction)
    pub fn remove_guest_email_index(
        &self,
        txn: &WriteTransaction,
        email: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(GUEST_EMAIL_ORDERS_TABLE)?;
        table.remove((email, order_id))?;
        Ok(())
    }

    /// Unclaimed guest order IDs for a normalized email
    pub fn get_guest_order_ids_by_email(&self, email: &str) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GUEST_EMAIL_ORDERS_TABLE)?;

        let mut ids = Vec::new();
        for result in table.range((email, "")..)? {
            let (key, _value) = result?;
            let (indexed_email, order_id) = key.value();
            if indexed_email != email {
                break;
            }
            ids.push(order_id.to_string());
        }
        Ok(ids)
    }

    // ========== Products ==========

    /// Get a product (within transaction)
    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;

        match table.get(product_id)? {
            Some(value) => {
                let product: Product = serde_json::from_slice(value.value())?;
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    /// Store a product (within transaction)
    pub fn store_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a product
    pub fn get_product(&self, product_id: &str) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;

        match table.get(product_id)? {
            Some(value) => {
                let product: Product = serde_json::from_slice(value.value())?;
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace a catalog product (own transaction)
    pub fn upsert_product(&self, product: &Product) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.store_product(&txn, product)?;
        txn.commit()?;
        Ok(())
    }

    // ========== Audit Events ==========

    /// Append an audit event for an order, extending its hash chain
    ///
    /// Runs in its own transaction; never part of an order mutation.
    pub fn append_audit_event(
        &self,
        order_id: &str,
        action: AuditAction,
        actor_id: Option<&str>,
        timestamp: i64,
        details: serde_json::Value,
    ) -> StorageResult<OrderAuditEvent> {
        let txn = self.db.begin_write()?;
        let event = {
            let mut table = txn.open_table(AUDIT_EVENTS_TABLE)?;

            // 读取该订单最后一条记录的序列号和哈希
            let last = match table
                .range((order_id, 0u64)..=(order_id, u64::MAX))?
                .next_back()
            {
                Some(result) => {
                    let (_key, value) = result?;
                    let last: OrderAuditEvent = serde_json::from_slice(value.value())?;
                    Some((last.seq, last.curr_hash))
                }
                None => None,
            };
            let (seq, prev_hash) = match last {
                Some((seq, hash)) => (seq + 1, hash),
                None => (1, GENESIS_HASH.to_string()),
            };

            let curr_hash =
                compute_audit_hash(&prev_hash, order_id, seq, timestamp, action, actor_id, &details);
            let event = OrderAuditEvent {
                order_id: order_id.to_string(),
                seq,
                action,
                actor_id: actor_id.map(str::to_string),
                timestamp,
                details,
                prev_hash,
                curr_hash,
            };
            let value = serde_json::to_vec(&event)?;
            table.insert((order_id, seq), value.as_slice())?;
            event
        };
        txn.commit()?;
        Ok(event)
    }

    /// All audit events of an order, in sequence order
    pub fn get_audit_events(&self, order_id: &str) -> StorageResult<Vec<OrderAuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            let event: OrderAuditEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }
        Ok(events)
    }

    // ========== Notifications ==========

    /// Persist a notification, assigning its sequence number
    pub fn store_notification(&self, notification: &mut Notification) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        notification.seq = Self::next_counter(&txn, NOTIFICATION_SEQ_KEY)?;
        {
            let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
            let value = serde_json::to_vec(notification)?;
            table.insert(
                (notification.recipient.as_str(), notification.seq),
                value.as_slice(),
            )?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Notifications addressed to a recipient, oldest first
    pub fn get_notifications(&self, recipient: &str) -> StorageResult<Vec<Notification>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTIFICATIONS_TABLE)?;

        let mut notifications = Vec::new();
        for result in table.range((recipient, 0u64)..=(recipient, u64::MAX))? {
            let (_key, value) = result?;
            let notification: Notification = serde_json::from_slice(value.value())?;
            notifications.push(notification);
        }
        Ok(notifications)
    }

    /// Get a recipient's delivery preference
    pub fn get_notification_preference(
        &self,
        recipient: &str,
    ) -> StorageResult<Option<NotificationPreference>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTIFICATION_PREFS_TABLE)?;

        match table.get(recipient)? {
            Some(value) => {
                let pref: NotificationPreference = serde_json::from_slice(value.value())?;
                Ok(Some(pref))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace a recipient's delivery preference
    pub fn set_notification_preference(&self, pref: &NotificationPreference) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(NOTIFICATION_PREFS_TABLE)?;
            let value = serde_json::to_vec(pref)?;
            table.insert(pref.recipient.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Append to the dispatcher failure log
    pub fn record_dispatch_failure(&self, failure: &mut DispatchFailure) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        failure.seq = Self::next_counter(&txn, FAILURE_SEQ_KEY)?;
        {
            let mut table = txn.open_table(NOTIFICATION_FAILURES_TABLE)?;
            let value = serde_json::to_vec(failure)?;
            table.insert(failure.seq, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// The dispatcher failure log, oldest first
    pub fn get_dispatch_failures(&self) -> StorageResult<Vec<DispatchFailure>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTIFICATION_FAILURES_TABLE)?;

        let mut failures = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let failure: DispatchFailure = serde_json::from_slice(value.value())?;
            failures.push(failure);
        }
        Ok(failures)
    }
}
