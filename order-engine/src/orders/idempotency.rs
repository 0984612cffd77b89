//! Idempotency guard for order creation
//!
//! The token lookup and the registration both run inside the creating write
//! transaction. A retried submission carrying the same token therefore sees
//! either nothing (and creates) or the committed order (and replays it).

use redb::WriteTransaction;
use shared::error::ErrorCode;
use shared::order::Order;

use super::storage::OrderStorage;
use super::traits::OrderError;

/// Maximum accepted token length
pub const MAX_TOKEN_LEN: usize = 128;

/// Normalize a caller token; blank tokens count as absent
pub fn validate_token(token: Option<&str>) -> Result<Option<String>, OrderError> {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if token.len() > MAX_TOKEN_LEN {
        return Err(OrderError::validation(
            ErrorCode::IdempotencyTokenInvalid,
            format!("idempotency token longer than {} bytes", MAX_TOKEN_LEN),
        ));
    }
    Ok(Some(token.to_string()))
}

/// Order previously created with `token`, read through `txn`
pub fn find_existing(
    storage: &OrderStorage,
    txn: &WriteTransaction,
    token: &str,
) -> Result<Option<Order>, OrderError> {
    let Some(order_id) = storage.find_order_id_by_token_txn(txn, token)? else {
        return Ok(None);
    };
    match storage.get_order_txn(txn, &order_id)? {
        Some(order) => Ok(Some(order)),
        None => {
            // 令牌存在但订单缺失：按未使用处理，新订单会覆盖该令牌
            tracing::error!(token, order_id = %order_id, "Idempotency token points at a missing order");
            Ok(None)
        }
    }
}

/// Bind `token` to `order_id` in the same transaction as the order write
pub fn register(
    storage: &OrderStorage,
    txn: &WriteTransaction,
    token: &str,
    order_id: &str,
) -> Result<(), OrderError> {
    storage.register_token(txn, token, order_id)?;
    Ok(())
}
