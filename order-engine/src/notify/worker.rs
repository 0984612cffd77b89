//! 通知后台 Worker
//!
//! 消费 NotificationRequest：先持久化通知记录，再按用户偏好调用外部渠道。
//! 任何失败只记录日志和失败表，不重试。

use std::sync::Arc;
use tokio::sync::mpsc;

use super::channel::DeliveryChannel;
use super::types::{DispatchFailure, FailureStage, Notification, NotificationRequest};
use crate::orders::storage::OrderStorage;

pub struct NotificationWorker {
    storage: OrderStorage,
    channel: Arc<dyn DeliveryChannel>,
}

impl NotificationWorker {
    pub fn new(storage: OrderStorage, channel: Arc<dyn DeliveryChannel>) -> Self {
        Self { storage, channel }
    }

    /// 运行 worker（阻塞直到通道关闭）
    pub async fn run(self, mut rx: mpsc::Receiver<NotificationRequest>) {
        tracing::info!(channel = self.channel.name(), "📨 Notification worker started");

        while let Some(req) = rx.recv().await {
            self.handle(req).await;
        }

        tracing::info!("Notification channel closed, worker stopping");
    }

    async fn handle(&self, req: NotificationRequest) {
        // 1. 持久化
        let storage = self.storage.clone();
        let mut notification = Notification::from_request(&req, shared::util::now_millis());
        let persisted = tokio::task::spawn_blocking(move || {
            let opt_in = storage
                .get_notification_preference(&notification.recipient)?
                .map(|p| p.opt_in_external)
                .unwrap_or(false);
            storage.store_notification(&mut notification)?;
            Ok::<_, crate::orders::storage::StorageError>((notification, opt_in))
        })
        .await;

        let (notification, opt_in) = match persisted {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                tracing::error!(order_id = %req.order_id, error = %e, "Failed to persist notification");
                self.record_failure(FailureStage::Persist, &req, e.to_string()).await;
                return;
            }
            Err(e) => {
                tracing::error!(order_id = %req.order_id, error = %e, "Notification persist task panicked");
                self.record_failure(FailureStage::Persist, &req, e.to_string()).await;
                return;
            }
        };

        // 2. 外部渠道（需用户明确同意）
        if !opt_in {
            tracing::debug!(recipient = %req.recipient, "External delivery not opted in");
            return;
        }

        if let Err(e) = self.channel.deliver(&notification).await {
            tracing::warn!(
                order_id = %req.order_id,
                channel = self.channel.name(),
                error = %e,
                "Notification delivery failed"
            );
            self.record_failure(FailureStage::Deliver, &req, e.to_string()).await;
        }
    }

    async fn record_failure(&self, stage: FailureStage, req: &NotificationRequest, error: String) {
        let storage = self.storage.clone();
        let mut failure = DispatchFailure::new(stage, req, error);
        let result =
            tokio::task::spawn_blocking(move || storage.record_dispatch_failure(&mut failure)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Failed to record dispatch failure"),
            Err(e) => tracing::error!(error = %e, "Failure record task panicked"),
        }
    }
}
