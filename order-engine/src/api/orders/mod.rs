//! Order API Module
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/orders | POST | 下单 (游客可不带令牌) | 可选 |
//! | /api/orders | GET | 全部订单 (?status=) | 管理员 |
//! | /api/orders/claim | POST | 认领游客订单 | 用户 |
//! | /api/orders/{id} | GET | 订单详情 | 所有者/管理员 |
//! | /api/orders/{id}/status | POST | 修改状态 | 管理员 |
//! | /api/orders/{id}/payments | POST | 记账 | 管理员 |
//! | /api/orders/{id}/proofs | POST | 上传付款凭证 | 所有者/管理员 |
//! | /api/orders/{id}/proofs/{proof_id}/review | POST | 审核凭证 | 管理员 |
//! | /api/orders/{id}/audit | GET | 审计链 | 管理员 |
//! | /api/owners/{uid}/orders | GET | 用户订单 | 本人/管理员 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/orders", routes())
        .route("/api/owners/{uid}/orders", get(handler::list_for_owner))
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/claim", post(handler::claim))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", post(handler::set_status))
        .route("/{id}/payments", post(handler::add_payment))
        .route("/{id}/proofs", post(handler::upload_proof))
        .route("/{id}/proofs/{proof_id}/review", post(handler::review_proof))
        .route("/{id}/audit", get(handler::audit_trail))
}
