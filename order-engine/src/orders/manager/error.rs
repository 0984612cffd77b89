use super::super::storage::StorageError;
use super::super::traits::OrderError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Order(OrderError),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{1}")]
    Forbidden(ErrorCode, String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// How a caller should react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, rejected before any transaction
    Validation,
    /// Rule violation, transaction aborted, store unchanged
    Business,
    /// Identity missing or not allowed
    Authorization,
    /// Storage contention/failure, safe to retry
    Transient,
}

impl ManagerError {
    pub fn forbidden(code: ErrorCode, msg: impl Into<String>) -> Self {
        ManagerError::Forbidden(code, msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ManagerError::Storage(_) | ManagerError::Internal(_) => ErrorKind::Transient,
            ManagerError::Unauthorized | ManagerError::Forbidden(..) => ErrorKind::Authorization,
            ManagerError::Order(OrderError::Validation(..)) => ErrorKind::Validation,
            ManagerError::Order(OrderError::NotOwner(_)) => ErrorKind::Authorization,
            ManagerError::Order(OrderError::Storage(_)) => ErrorKind::Transient,
            ManagerError::Order(_) => ErrorKind::Business,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            ManagerError::Storage(e) => classify_storage_error(e),
            ManagerError::Order(OrderError::Storage(e)) => classify_storage_error(e),
            ManagerError::Order(e) => e.error_code(),
            ManagerError::Unauthorized => ErrorCode::NotAuthenticated,
            ManagerError::Forbidden(code, _) => *code,
            ManagerError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    // 先按枚举变体精确匹配
    if let StorageError::Serialization(_) = e {
        return ErrorCode::InternalError;
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 内存不足
    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return ErrorCode::OutOfMemory;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙（redb 的 Database/Transaction/Table/Storage/Commit 错误）
    ErrorCode::SystemBusy
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        let code = err.error_code();
        match err {
            ManagerError::Storage(e) | ManagerError::Order(OrderError::Storage(e)) => {
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                // 保留技术细节用于日志，对外只返回错误码
                AppError::new(code)
            }
            ManagerError::Order(OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => AppError::with_message(
                code,
                format!("Insufficient stock for product {}", product_id),
            )
            .with_detail("product_id", product_id)
            .with_detail("requested", requested)
            .with_detail("available", available),
            ManagerError::Order(OrderError::Overpayment { amount, balance }) => {
                AppError::with_message(
                    code,
                    format!("Payment of {} exceeds remaining balance {}", amount, balance),
                )
                .with_detail("amount", amount.to_string())
                .with_detail("balance", balance.to_string())
            }
            ManagerError::Order(OrderError::IllegalTransition { from, to }) => {
                AppError::with_message(code, format!("Cannot move order from {} to {}", from, to))
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            ManagerError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error occurred");
                AppError::new(code)
            }
            other => AppError::with_message(code, other.to_string()),
        }
    }
}

impl From<OrderError> for ManagerError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Storage(e) => ManagerError::Storage(e),
            other => ManagerError::Order(other),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::order::OrderStatus;

    #[test]
    fn test_kinds() {
        let v: ManagerError = OrderError::validation(ErrorCode::OrderEmpty, "empty").into();
        assert_eq!(v.kind(), ErrorKind::Validation);

        let b: ManagerError = OrderError::Overpayment {
            amount: Decimal::ONE,
            balance: Decimal::ZERO,
        }
        .into();
        assert_eq!(b.kind(), ErrorKind::Business);

        assert_eq!(ManagerError::Unauthorized.kind(), ErrorKind::Authorization);
        assert_eq!(
            ManagerError::Internal("join".to_string()).kind(),
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_app_error_mapping() {
        let err: AppError = ManagerError::from(OrderError::IllegalTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        })
        .into();
        assert_eq!(err.code, ErrorCode::OrderIllegalTransition);
        assert_eq!(err.http_status(), http::StatusCode::CONFLICT);

        let err: AppError = ManagerError::from(OrderError::InsufficientStock {
            product_id: "p-1".to_string(),
            requested: 3,
            available: 1,
        })
        .into();
        assert_eq!(err.code, ErrorCode::ProductOutOfStock);
        let details = err.details.unwrap();
        assert_eq!(details["available"], 1);

        let err: AppError = ManagerError::forbidden(ErrorCode::EmailMismatch, "no").into();
        assert_eq!(err.code, ErrorCode::EmailMismatch);
    }

    #[test]
    fn test_not_found_mapping() {
        let err: AppError = ManagerError::from(OrderError::OrderNotFound("o".to_string())).into();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
        assert_eq!(err.http_status(), http::StatusCode::NOT_FOUND);
    }
}
