//! HTTP status mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::ProofNotFound
            | Self::ProductNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::OrderAlreadyPaid
            | Self::OrderAlreadyCancelled
            | Self::OrderIllegalTransition
            | Self::ProofAlreadyReviewed
            | Self::ProductOutOfStock => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied
            | Self::AdminRequired
            | Self::NotOrderOwner
            | Self::EmailNotVerified
            | Self::EmailMismatch => StatusCode::FORBIDDEN,

            // 422 Unprocessable (ledger rule violations)
            Self::PaymentExceedsBalance | Self::ProofLimitReached => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 503 Service Unavailable (transient errors, client can retry)
            Self::SystemBusy => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::StorageFull
            | Self::OutOfMemory
            | Self::StorageCorrupted
            | Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ProductOutOfStock.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::TokenExpired.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::NotOrderOwner.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::PaymentExceedsBalance.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ErrorCode::SystemBusy.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::PaymentInvalidAmount.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::OrderInvalidStatus.http_status(), StatusCode::BAD_REQUEST);
    }
}
