//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 订单、付款、凭证、认领、审计
//! - [`notifications`] - 站内通知与偏好
//! - [`products`] - 商品目录写入 (管理员)
//!
//! 所有存储操作都是同步的，handler 通过 [`run_blocking`] 放到阻塞线程池执行。

pub mod health;
pub mod notifications;
pub mod orders;
pub mod products;

use crate::core::ServerState;
use crate::orders::{ManagerResult, OrdersManager};
use crate::utils::{AppError, AppResult};

/// 在 blocking 线程池中调用 OrdersManager
pub(crate) async fn run_blocking<T, F>(state: &ServerState, f: F) -> AppResult<T>
where
    F: FnOnce(&OrdersManager) -> ManagerResult<T> + Send + 'static,
    T: Send + 'static,
{
    let manager = state.manager();
    tokio::task::spawn_blocking(move || f(&manager))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Blocking order task failed");
            AppError::internal("order task failed")
        })?
        .map_err(AppError::from)
}
