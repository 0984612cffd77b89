//! Unified error codes for the storefront order engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment / proof errors
//! - 6xxx: Product (inventory) errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Identity email is not verified
    EmailNotVerified = 1008,
    /// Claimed email does not match the verified identity
    EmailMismatch = 1009,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,
    /// Requester does not own the order
    NotOrderOwner = 2006,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is already fully paid
    OrderAlreadyPaid = 4002,
    /// Order is cancelled (terminal)
    OrderAlreadyCancelled = 4004,
    /// Order has no items
    OrderEmpty = 4007,
    /// Status transition is not allowed
    OrderIllegalTransition = 4008,
    /// Unrecognized order status value
    OrderInvalidStatus = 4009,
    /// Idempotency token is malformed
    IdempotencyTokenInvalid = 4010,
    /// Guest order without contact info
    GuestInfoRequired = 4011,

    // ==================== 5xxx: Payment ====================
    /// Payment amount is not positive or not representable
    PaymentInvalidAmount = 5006,
    /// Payment would exceed the order total
    PaymentExceedsBalance = 5007,
    /// Payment proof not found
    ProofNotFound = 5101,
    /// Payment proof was already reviewed
    ProofAlreadyReviewed = 5102,
    /// Too many proofs attached to one order
    ProofLimitReached = 5103,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product price is invalid
    ProductInvalidPrice = 6002,
    /// Product does not have enough stock
    ProductOutOfStock = 6003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,

    // ==================== 94xx: Storage ====================
    /// Storage full (disk space insufficient)
    StorageFull = 9401,
    /// Out of memory
    OutOfMemory = 9402,
    /// Storage corrupted (data file damaged)
    StorageCorrupted = 9403,
    /// System busy (transaction conflict or IO error, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether the whole operation may be safely retried by the caller
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::SystemBusy)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Token is invalid",
            ErrorCode::EmailNotVerified => "Email address is not verified",
            ErrorCode::EmailMismatch => "Email does not match the signed-in account",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Admin role required",
            ErrorCode::NotOrderOwner => "Order belongs to another customer",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyPaid => "Order is already fully paid",
            ErrorCode::OrderAlreadyCancelled => "Order has been cancelled",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::OrderIllegalTransition => "Order status transition is not allowed",
            ErrorCode::OrderInvalidStatus => "Unrecognized order status",
            ErrorCode::IdempotencyTokenInvalid => "Idempotency token is invalid",
            ErrorCode::GuestInfoRequired => "Guest orders require contact information",

            // Payment
            ErrorCode::PaymentInvalidAmount => "Payment amount must be positive",
            ErrorCode::PaymentExceedsBalance => "Payment exceeds the outstanding balance",
            ErrorCode::ProofNotFound => "Payment proof not found",
            ErrorCode::ProofAlreadyReviewed => "Payment proof was already reviewed",
            ErrorCode::ProofLimitReached => "Too many payment proofs for this order",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInvalidPrice => "Product price is invalid",
            ErrorCode::ProductOutOfStock => "Product is out of stock",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",

            // Storage
            ErrorCode::StorageFull => "Storage is full",
            ErrorCode::OutOfMemory => "Out of memory",
            ErrorCode::StorageCorrupted => "Storage is corrupted",
            ErrorCode::SystemBusy => "System busy, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1008 => Ok(ErrorCode::EmailNotVerified),
            1009 => Ok(ErrorCode::EmailMismatch),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),
            2006 => Ok(ErrorCode::NotOrderOwner),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyPaid),
            4004 => Ok(ErrorCode::OrderAlreadyCancelled),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::OrderIllegalTransition),
            4009 => Ok(ErrorCode::OrderInvalidStatus),
            4010 => Ok(ErrorCode::IdempotencyTokenInvalid),
            4011 => Ok(ErrorCode::GuestInfoRequired),

            // Payment
            5006 => Ok(ErrorCode::PaymentInvalidAmount),
            5007 => Ok(ErrorCode::PaymentExceedsBalance),
            5101 => Ok(ErrorCode::ProofNotFound),
            5102 => Ok(ErrorCode::ProofAlreadyReviewed),
            5103 => Ok(ErrorCode::ProofLimitReached),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductInvalidPrice),
            6003 => Ok(ErrorCode::ProductOutOfStock),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),

            // Storage
            9401 => Ok(ErrorCode::StorageFull),
            9402 => Ok(ErrorCode::OutOfMemory),
            9403 => Ok(ErrorCode::StorageCorrupted),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::AdminRequired.code(), 2003);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::PaymentExceedsBalance.code(), 5007);
        assert_eq!(ErrorCode::ProductOutOfStock.code(), 6003);
        assert_eq!(ErrorCode::SystemBusy.code(), 9404);
    }

    #[test]
    fn test_try_from_matches_code() {
        let all = [
            ErrorCode::Success,
            ErrorCode::EmailMismatch,
            ErrorCode::NotOrderOwner,
            ErrorCode::OrderIllegalTransition,
            ErrorCode::ProofLimitReached,
            ErrorCode::ProductNotFound,
            ErrorCode::StorageCorrupted,
        ];
        for code in all {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_invalid_code() {
        assert_eq!(ErrorCode::try_from(7777), Err(InvalidErrorCode(7777)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");
        let code: ErrorCode = serde_json::from_str("5007").unwrap();
        assert_eq!(code, ErrorCode::PaymentExceedsBalance);
    }

    #[test]
    fn test_only_system_busy_is_retryable() {
        assert!(ErrorCode::SystemBusy.is_retryable());
        assert!(!ErrorCode::DatabaseError.is_retryable());
        assert!(!ErrorCode::PaymentExceedsBalance.is_retryable());
    }
}
