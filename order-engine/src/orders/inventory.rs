//! Inventory & pricing reader
//!
//! All reads and writes go through the caller's write transaction, so a
//! stock check and the decrement it guards can never interleave with another
//! creation touching the same product.

use redb::WriteTransaction;
use shared::order::{OrderItemSnapshot, OrderLineInput};

use super::money::round_money;
use super::storage::OrderStorage;
use super::traits::OrderError;

/// Reserve stock for `lines` and build the frozen item snapshot
///
/// Lines naming the same product are summed for the stock check but kept as
/// separate snapshot lines. Either every product is decremented or none is:
/// the caller aborts the transaction on error.
pub fn reserve(
    storage: &OrderStorage,
    txn: &WriteTransaction,
    lines: &[OrderLineInput],
) -> Result<Vec<OrderItemSnapshot>, OrderError> {
    // 1. 合并同一商品的数量（保持首次出现顺序）
    let mut requested: Vec<(&str, i64)> = Vec::new();
    for line in lines {
        match requested.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, qty)) => *qty += i64::from(line.quantity),
            None => requested.push((line.product_id.as_str(), i64::from(line.quantity))),
        }
    }

    // 2. 读取并校验所有商品（任何一个失败则整体拒绝）
    let mut products = Vec::with_capacity(requested.len());
    for (product_id, qty) in &requested {
        let product = storage
            .get_product_txn(txn, product_id)?
            .ok_or_else(|| OrderError::ProductNotFound(product_id.to_string()))?;
        if product.stock < *qty {
            return Err(OrderError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: *qty,
                available: product.stock,
            });
        }
        products.push((product, *qty));
    }

    // 3. 价格快照来自刚读取的商品，调用方价格一律忽略
    // 目录由外部维护，快照价格按分取整，保证余额可被付清
    let items = lines
        .iter()
        .filter_map(|line| {
            products
                .iter()
                .find(|(p, _)| p.id == line.product_id)
                .map(|(p, _)| OrderItemSnapshot {
                    product_id: p.id.clone(),
                    name: p.name.clone(),
                    unit_price: round_money(p.price),
                    quantity: line.quantity,
                    image: p.image.clone(),
                })
        })
        .collect();

    // 4. 扣减库存
    for (mut product, qty) in products {
        product.stock -= qty;
        storage.store_product(txn, &product)?;
    }

    Ok(items)
}

/// Put the stock of every snapshot line back
///
/// A product that no longer exists in the catalog is skipped with a warning;
/// there is nothing left to restock.
pub fn restore(
    storage: &OrderStorage,
    txn: &WriteTransaction,
    items: &[OrderItemSnapshot],
) -> Result<(), OrderError> {
    for item in items {
        match storage.get_product_txn(txn, &item.product_id)? {
            Some(mut product) => {
                product.stock += i64::from(item.quantity);
                storage.store_product(txn, &product)?;
            }
            None => {
                tracing::warn!(
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    "Product missing from catalog, stock not restored"
                );
            }
        }
    }
    Ok(())
}
