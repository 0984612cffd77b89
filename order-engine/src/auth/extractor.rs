//! JWT Extractors
//!
//! - [`CurrentUser`]: the bearer token is required
//! - [`MaybeUser`]: the bearer token is optional (guest checkout)

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::AppError;

use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;

fn authenticate(parts: &mut Parts, state: &ServerState, header: &str) -> Result<CurrentUser, AppError> {
    let token = JwtService::extract_from_header(header)
        .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

    match state.jwt_service().validate_token(token) {
        Ok(claims) => {
            let user = CurrentUser::try_from(claims)
                .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {}", e)))?;

            // Store in extensions for potential reuse
            parts.extensions.insert(user.clone());
            Ok(user)
        }
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = format!("{}", e),
                uri = format!("{:?}", parts.uri)
            );

            match e {
                JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            }
        }
    }
}

fn authorization_header(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// JWT Auth Extractor
impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        match authorization_header(parts) {
            Some(header) => authenticate(parts, state, &header),
            None => {
                security_log!("WARN", "auth_missing", uri = format!("{:?}", parts.uri));
                Err(AppError::unauthorized())
            }
        }
    }
}

/// Optional identity: absent header means guest, a bad token is still rejected
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<ServerState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(MaybeUser(Some(user.clone())));
        }

        match authorization_header(parts) {
            Some(header) => authenticate(parts, state, &header).map(|u| MaybeUser(Some(u))),
            None => Ok(MaybeUser(None)),
        }
    }
}
