use std::sync::Arc;

use crate::audit::{AuditService, AuditWorker};
use crate::auth::JwtService;
use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, Result};
use crate::notify::{
    DeliveryChannel, LogDeliveryChannel, NotificationDispatcher, NotificationWorker,
    WebhookDeliveryChannel,
};
use crate::orders::{OrderStorage, OrdersManager};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，axum 每个请求克隆一次。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | storage | OrderStorage | redb 存储 |
/// | orders_manager | Arc<OrdersManager> | 订单命令处理 |
/// | jwt_service | Arc<JwtService> | JWT 校验 |
///
/// 状态同时持有审计/通知队列的发送端；全部克隆释放后 worker 退出。
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: OrderStorage,
    pub orders_manager: Arc<OrdersManager>,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// 打开数据库并启动后台 worker
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn initialize(config: &Config) -> Result<(Self, BackgroundTasks)> {
        std::fs::create_dir_all(&config.work_dir)?;
        let db_path = config.db_path();
        tracing::info!(path = %db_path.display(), "Opening order database");
        let storage = OrderStorage::open(&db_path)?;
        Ok(Self::with_storage(config.clone(), storage))
    }

    /// 使用已打开的存储构建状态 (测试也走这里)
    pub fn with_storage(config: Config, storage: OrderStorage) -> (Self, BackgroundTasks) {
        let (audit, audit_rx) = AuditService::new(config.audit_queue_capacity);
        let (notifier, notify_rx) =
            NotificationDispatcher::new(storage.clone(), config.notify_queue_capacity);

        let channel: Arc<dyn DeliveryChannel> = match &config.notify_webhook_url {
            Some(url) => Arc::new(WebhookDeliveryChannel::new(url.clone())),
            None => Arc::new(LogDeliveryChannel),
        };

        let mut tasks = BackgroundTasks::new();
        tasks.spawn("audit_worker", AuditWorker::new(storage.clone()).run(audit_rx));
        tasks.spawn(
            "notification_worker",
            NotificationWorker::new(storage.clone(), channel).run(notify_rx),
        );

        let orders_manager = Arc::new(OrdersManager::new(storage.clone(), audit, notifier));
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        let state = Self {
            config,
            storage,
            orders_manager,
            jwt_service,
        };
        (state, tasks)
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    pub fn manager(&self) -> Arc<OrdersManager> {
        self.orders_manager.clone()
    }
}
