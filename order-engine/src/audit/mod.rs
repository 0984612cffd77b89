//! 审计日志模块：订单级防篡改审计追踪
//!
//! # 架构
//!
//! ```text
//! OrdersManager (提交后)
//!   └─ AuditService::log() → mpsc → AuditWorker → redb (audit_events 表)
//!
//! 每个订单一条 SHA256 哈希链: genesis → event₁ → event₂ → ... → eventₙ
//! ```
//!
//! 审计写入失败不会回滚订单操作，只记录错误日志。

pub mod service;
pub mod types;
pub mod worker;

pub use service::{AuditLogRequest, AuditService};
pub use types::{
    AuditAction, AuditChainVerification, AuditTrail, OrderAuditEvent, compute_audit_hash,
    verify_chain,
};
pub use worker::AuditWorker;
