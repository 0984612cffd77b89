//! 审计日志后台 Worker
//!
//! 从 mpsc 通道消费 AuditLogRequest，写入 redb。
//! 通道关闭时自动退出。

use super::service::AuditLogRequest;
use crate::orders::storage::OrderStorage;

/// 审计日志后台 Worker
pub struct AuditWorker {
    storage: OrderStorage,
}

impl AuditWorker {
    pub fn new(storage: OrderStorage) -> Self {
        Self { storage }
    }

    /// 运行 worker（阻塞直到通道关闭）
    pub async fn run(self, mut rx: tokio::sync::mpsc::Receiver<AuditLogRequest>) {
        tracing::info!("📋 Audit log worker started");

        while let Some(req) = rx.recv().await {
            let storage = self.storage.clone();
            let result = tokio::task::spawn_blocking(move || {
                storage.append_audit_event(
                    &req.order_id,
                    req.action,
                    req.actor_id.as_deref(),
                    req.timestamp,
                    req.details,
                )
            })
            .await;

            match result {
                Ok(Ok(event)) => {
                    tracing::debug!(
                        order_id = %event.order_id,
                        seq = event.seq,
                        action = %event.action,
                        "Audit entry recorded"
                    );
                }
                Ok(Err(e)) => {
                    tracing::error!("Failed to write audit entry: {:?}", e);
                }
                Err(e) => {
                    tracing::error!("Audit write task panicked: {:?}", e);
                }
            }
        }

        tracing::info!("Audit log channel closed, worker stopping");
    }
}
