//! 审计日志服务
//!
//! `AuditService::log()` 只入队，不阻塞调用方；写入由 [`super::AuditWorker`] 完成。

use std::sync::Arc;
use tokio::sync::mpsc;

use super::types::AuditAction;

/// 发送到 AuditService 的日志请求
#[derive(Debug, Clone)]
pub struct AuditLogRequest {
    pub order_id: String,
    pub action: AuditAction,
    pub actor_id: Option<String>,
    pub timestamp: i64,
    pub details: serde_json::Value,
}

/// 审计日志服务
pub struct AuditService {
    tx: mpsc::Sender<AuditLogRequest>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish_non_exhaustive()
    }
}

impl AuditService {
    /// 创建审计服务，返回 worker 需要消费的接收端
    pub fn new(buffer_size: usize) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        (Arc::new(Self { tx }), rx)
    }

    /// 记录审计日志（非阻塞）
    ///
    /// 通道已满或已关闭时丢弃并记录错误日志，订单操作本身不受影响。
    pub fn log(
        &self,
        order_id: impl Into<String>,
        action: AuditAction,
        actor_id: Option<String>,
        details: serde_json::Value,
    ) {
        let req = AuditLogRequest {
            order_id: order_id.into(),
            action,
            actor_id,
            timestamp: shared::util::now_millis(),
            details,
        };
        if let Err(e) = self.tx.try_send(req) {
            let req = match &e {
                mpsc::error::TrySendError::Full(r) | mpsc::error::TrySendError::Closed(r) => r,
            };
            tracing::error!(
                order_id = %req.order_id,
                action = %req.action,
                error = %e,
                "Failed to enqueue audit entry"
            );
        }
    }
}
