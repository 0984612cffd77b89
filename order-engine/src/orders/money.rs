//! Money validation and ledger arithmetic using rust_decimal
//!
//! Amounts are rounded to 2 decimal places (half-up) before they touch the
//! ledger. Money fields on [`Order`] are only ever derived from the ledger via
//! [`Order::recompute_money`].

use crate::orders::traits::OrderError;
use rust_decimal::prelude::*;
use shared::error::ErrorCode;
use shared::order::{Order, OrderLineInput, PaymentEntry};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: i32 = 9999;
/// Maximum allowed single payment amount (1,000,000)
pub const MAX_PAYMENT_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Round a monetary value to 2 decimal places, half-up
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate an order line before processing
pub fn validate_line(line: &OrderLineInput) -> Result<(), OrderError> {
    if line.product_id.trim().is_empty() {
        return Err(OrderError::validation(
            ErrorCode::RequiredField,
            "product_id is required",
        ));
    }
    if line.quantity <= 0 {
        return Err(OrderError::validation(
            ErrorCode::ValueOutOfRange,
            format!("quantity must be positive, got {}", line.quantity),
        ));
    }
    if line.quantity > MAX_QUANTITY {
        return Err(OrderError::validation(
            ErrorCode::ValueOutOfRange,
            format!(
                "quantity exceeds maximum allowed ({}), got {}",
                MAX_QUANTITY, line.quantity
            ),
        ));
    }
    Ok(())
}

/// Validate and normalize a payment amount
///
/// Returns the rounded amount that will be written to the ledger.
pub fn validate_payment_amount(amount: Decimal) -> Result<Decimal, OrderError> {
    let amount = round_money(amount);
    if amount <= Decimal::ZERO {
        return Err(OrderError::validation(
            ErrorCode::PaymentInvalidAmount,
            format!("payment amount must be positive, got {}", amount),
        ));
    }
    if amount > MAX_PAYMENT_AMOUNT {
        return Err(OrderError::validation(
            ErrorCode::PaymentInvalidAmount,
            format!(
                "payment amount exceeds maximum allowed ({}), got {}",
                MAX_PAYMENT_AMOUNT, amount
            ),
        ));
    }
    Ok(amount)
}

/// Append a ledger entry, refusing any amount that would exceed the total
///
/// On error the order is left untouched.
pub fn apply_payment(order: &mut Order, entry: PaymentEntry) -> Result<(), OrderError> {
    let new_amount_paid = order.amount_paid + entry.amount;
    if new_amount_paid > order.total {
        return Err(OrderError::Overpayment {
            amount: entry.amount,
            balance: order.balance,
        });
    }
    order.payments.push(entry);
    order.recompute_money();
    Ok(())
}
