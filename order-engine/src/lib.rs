//! Storefront Order Engine - 订单交易与付款账本
//!
//! # 架构概述
//!
//! - **订单** (`orders`): redb 事务内的下单/状态机/账本/凭证审核/游客认领
//! - **审计** (`audit`): 每个订单一条 SHA-256 哈希链
//! - **通知** (`notify`): 提交后的有界队列分发
//! - **认证** (`auth`): 外部身份服务签发的 JWT
//! - **HTTP API** (`api`): axum 路由和处理器
//!
//! # 模块结构
//!
//! ```text
//! order-engine/src/
//! ├── core/          # 配置、状态、后台任务、服务器
//! ├── auth/          # JWT 校验、提取器
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 订单命令处理与存储
//! ├── audit/         # 审计哈希链
//! ├── notify/        # 通知分发
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod notify;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::{OrderStorage, OrdersManager};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 加载 `.env` 并初始化日志
///
/// 返回的 guard 需要在进程生命周期内持有 (文件日志刷新)。
pub fn setup_environment() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // .env 不存在不是错误
    let _ = dotenv::dotenv();

    let level = std::env::var("LOG_LEVEL").ok();
    let json = std::env::var("LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(level.as_deref(), json, log_dir.as_deref())
}

pub fn print_banner() {
    println!(
        r#"
  ____          _             _____             _
 / __ \        | |           |  ___|           (_)
| |  | |_ __ __| | ___ _ __  | |__ _ __   __ _ _ _ __   ___
| |  | | '__/ _` |/ _ \ '__| |  __| '_ \ / _` | | '_ \ / _ \
| |__| | | | (_| |  __/ |    | |__| | | | (_| | | | | |  __/
 \____/|_|  \__,_|\___|_|    \____/_| |_|\__, |_|_| |_|\___|
                                          __/ |
                                         |___/
    "#
    );
}
