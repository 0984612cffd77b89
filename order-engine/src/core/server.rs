//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::time::Duration;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::{BackgroundTasks, Config, Result, ServerState};

/// Worker 排空队列的最长等待时间
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// 组装所有 API 路由
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(crate::api::health::router())
        .merge(crate::api::orders::router())
        .merge(crate::api::notifications::router())
        .merge(crate::api::products::router())
}

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
    tasks: BackgroundTasks,
}

impl Server {
    /// 初始化状态 (打开数据库、启动 worker)
    pub fn new(config: Config) -> Result<Self> {
        let (state, tasks) = ServerState::initialize(&config)?;
        Ok(Self::with_state(config, state, tasks))
    }

    pub fn with_state(config: Config, state: ServerState, tasks: BackgroundTasks) -> Self {
        Self {
            config,
            state,
            tasks,
        }
    }

    pub fn router(&self) -> Router {
        build_app()
            .with_state(self.state.clone())
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http())
    }

    /// 运行直到 Ctrl-C，然后排空后台队列
    pub async fn run(self) -> Result<()> {
        let app = self.router();
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("🛒 Order engine listening on {}", addr);

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        // 释放最后的发送端，worker 处理完剩余请求后退出
        let Server { state, tasks, .. } = self;
        drop(state);
        tasks.shutdown(WORKER_DRAIN_TIMEOUT).await;
        Ok(())
    }
}
