//! Notification API Handlers

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::api::run_blocking;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::notify::{DispatchFailure, Notification, NotificationPreference};
use crate::utils::{ApiResponse, AppResult};

#[derive(Debug, Deserialize)]
pub struct PreferenceInput {
    pub opt_in_external: bool,
}

pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<Vec<Notification>>> {
    let notifications = run_blocking(&state, move |m| m.list_notifications(&user)).await?;
    Ok(ApiResponse::success(notifications))
}

pub async fn set_preference(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<PreferenceInput>,
) -> AppResult<ApiResponse<NotificationPreference>> {
    let pref = run_blocking(&state, move |m| {
        m.set_notification_preference(&user, payload.opt_in_external)
    })
    .await?;
    Ok(ApiResponse::success(pref))
}

/// Dispatcher failure log (admin)
pub async fn list_failures(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<Vec<DispatchFailure>>> {
    let failures = run_blocking(&state, move |m| m.list_notification_failures(&user)).await?;
    Ok(ApiResponse::success(failures))
}
