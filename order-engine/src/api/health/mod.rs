//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/health | GET | 健康检查 (含数据库读探测) | 无 |
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "uptime_seconds": 42,
//!   "checks": { "database": { "status": "ok", "latency_ms": 1 } }
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::time::SystemTime;

use crate::core::ServerState;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// healthy | degraded
    status: &'static str,
    version: &'static str,
    /// 运行时间 (秒)
    uptime_seconds: u64,
    checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    database: CheckResult,
}

/// 单项检查结果
#[derive(Serialize)]
pub struct CheckResult {
    /// 状态 (ok | error)
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl CheckResult {
    fn ok_with_latency(latency_ms: u64) -> Self {
        Self {
            status: "ok",
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

// 服务器启动时间 (懒加载静态变量)
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    // 数据库: 一次只读事务
    let storage = state.storage.clone();
    let db_start = std::time::Instant::now();
    let database = match tokio::task::spawn_blocking(move || storage.order_count()).await {
        Ok(Ok(_)) => CheckResult::ok_with_latency(db_start.elapsed().as_millis() as u64),
        Ok(Err(e)) => CheckResult::error(format!("Database error: {}", e)),
        Err(e) => CheckResult::error(format!("Health probe failed: {}", e)),
    };

    let all_ok = database.status == "ok";
    Json(HealthResponse {
        status: if all_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        checks: HealthChecks { database },
    })
}
