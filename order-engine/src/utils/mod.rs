//! 工具模块
//!
//! - [`logger`] - tracing 日志初始化
//! - 统一错误/响应类型 (from shared::error)

pub mod logger;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
