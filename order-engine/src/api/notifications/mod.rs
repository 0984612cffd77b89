//! Notification API Module
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/notifications | GET | 当前用户的通知 | 用户 |
//! | /api/notifications/preference | PUT | 外部渠道开关 | 用户 |
//! | /api/notifications/failures | GET | 投递失败记录 | 管理员 |

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest(
        "/api/notifications",
        Router::new()
            .route("/", get(handler::list))
            .route("/preference", put(handler::set_preference))
            .route("/failures", get(handler::list_failures)),
    )
}
