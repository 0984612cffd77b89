//! Guest order claim
//!
//! Rewrites unclaimed guest orders to a verified customer identity. Orders are
//! processed in batches of [`CLAIM_BATCH_SIZE`], one write transaction per
//! batch. The whole claim is not atomic; every order is re-checked inside its
//! batch transaction, so re-running a claim (or racing two) is a no-op for
//! orders that were already moved.

use shared::order::{Order, Ownership};

use super::storage::OrderStorage;
use super::traits::OrderError;

/// Orders rewritten per write transaction
pub const CLAIM_BATCH_SIZE: usize = 100;

/// Claim one batch of candidate order IDs for `uid`
///
/// `email` must already be normalized. Returns the orders actually claimed in
/// this batch. Index entries that no longer point at a matching guest order
/// are dropped.
pub fn claim_batch(
    storage: &OrderStorage,
    uid: &str,
    email: &str,
    order_ids: &[String],
    now: i64,
) -> Result<Vec<Order>, OrderError> {
    let txn = storage.begin_write()?;
    let mut claimed = Vec::new();

    for order_id in order_ids {
        let Some(mut order) = storage.get_order_txn(&txn, order_id)? else {
            storage.remove_guest_email_index(&txn, email, order_id)?;
            continue;
        };

        let still_guest = order.owner.is_guest();
        let same_email = order
            .guest_email()
            .map(shared::util::normalize_email)
            .is_some_and(|e| e == email);
        if !still_guest || !same_email {
            tracing::debug!(order_id = %order_id, "Stale guest index entry, dropping");
            storage.remove_guest_email_index(&txn, email, order_id)?;
            continue;
        }

        order.owner = Ownership::Customer {
            uid: uid.to_string(),
        };
        order.updated_at = now;
        order.updated_by = Some(uid.to_string());

        storage.store_order(&txn, &order)?;
        storage.add_owner_index(&txn, uid, &order.id)?;
        storage.remove_guest_email_index(&txn, email, &order.id)?;
        claimed.push(order);
    }

    txn.commit().map_err(super::storage::StorageError::from)?;
    Ok(claimed)
}
