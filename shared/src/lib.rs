//! Shared types for the storefront
//!
//! Common types used by the order engine and its clients: order records,
//! request payloads, catalog products, and the unified error/response types.

pub mod error;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use axum::Json;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
