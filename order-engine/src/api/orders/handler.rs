//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use shared::order::{
    AddPaymentInput, ClaimGuestOrdersInput, CreateOrderInput, Order, PaymentProof,
    ReviewProofInput, SetStatusInput, UploadProofInput,
};

use crate::api::run_blocking;
use crate::audit::AuditTrail;
use crate::auth::{CurrentUser, MaybeUser};
use crate::core::ServerState;
use crate::orders::status::parse_status;
use crate::orders::{ManagerError, OrderStatus};
use crate::utils::{ApiResponse, AppResult};

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub claimed: usize,
}

/// Create an order (bearer token optional)
pub async fn create(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
    Json(payload): Json<CreateOrderInput>,
) -> AppResult<ApiResponse<Order>> {
    let order = run_blocking(&state, move |m| m.create_order(user.as_ref(), payload)).await?;
    Ok(ApiResponse::success(order))
}

/// List all orders (admin)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let status: Option<OrderStatus> = query
        .status
        .as_deref()
        .map(parse_status)
        .transpose()
        .map_err(ManagerError::from)?;
    let orders = run_blocking(&state, move |m| m.list_orders(&user, status)).await?;
    Ok(ApiResponse::success(orders))
}

/// Orders of one owner
pub async fn list_for_owner(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(uid): Path<String>,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let orders = run_blocking(&state, move |m| m.list_orders_for_owner(&uid, &user)).await?;
    Ok(ApiResponse::success(orders))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    let order = run_blocking(&state, move |m| m.fetch_order(&id, &user)).await?;
    Ok(ApiResponse::success(order))
}

pub async fn set_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<SetStatusInput>,
) -> AppResult<ApiResponse<Order>> {
    let order = run_blocking(&state, move |m| {
        m.set_order_status(&id, &payload.status, payload.note, &user)
    })
    .await?;
    Ok(ApiResponse::success(order))
}

pub async fn add_payment(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<AddPaymentInput>,
) -> AppResult<ApiResponse<Order>> {
    let order = run_blocking(&state, move |m| {
        m.add_payment(&id, payload.amount, payload.note, &user)
    })
    .await?;
    Ok(ApiResponse::success(order))
}

pub async fn upload_proof(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UploadProofInput>,
) -> AppResult<ApiResponse<PaymentProof>> {
    let proof = run_blocking(&state, move |m| m.upload_proof(&id, payload, &user)).await?;
    Ok(ApiResponse::success(proof))
}

pub async fn review_proof(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path((id, proof_id)): Path<(String, String)>,
    Json(payload): Json<ReviewProofInput>,
) -> AppResult<ApiResponse<Order>> {
    let order = run_blocking(&state, move |m| {
        m.review_proof(&id, &proof_id, payload.decision, payload.amount, &user)
    })
    .await?;
    Ok(ApiResponse::success(order))
}

/// Claim guest orders placed with the caller's verified email
pub async fn claim(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ClaimGuestOrdersInput>,
) -> AppResult<ApiResponse<ClaimResponse>> {
    let claimed =
        run_blocking(&state, move |m| m.claim_guest_orders(&user, &payload.email)).await?;
    Ok(ApiResponse::success(ClaimResponse { claimed }))
}

pub async fn audit_trail(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<AuditTrail>> {
    let trail = run_blocking(&state, move |m| m.list_audit_events(&id, &user)).await?;
    Ok(ApiResponse::success(trail))
}
