use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::password;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Optional role assertion from the client's login form; must match the
    /// stored role when present.
    pub role: Option<Role>,
}

/// POST /auth/login - authenticate credentials and receive a bearer token.
///
/// Credential failures and unknown usernames return the same message, so the
/// endpoint does not reveal which accounts exist.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Value> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation_error(
            "username and password are required",
            None,
        ));
    }

    let identity = state
        .identities
        .find_by_username(payload.username.trim())
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::unauthorized("invalid credentials"))?;

    if !password::verify_password(&identity.credential_hash, &payload.password) {
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    if let Some(role) = payload.role {
        if role != identity.role {
            return Err(ApiError::unauthorized("role does not match this account"));
        }
    }

    if !identity.status.is_active() {
        return Err(ApiError::forbidden("account is not active"));
    }

    let token = state.tokens.issue(identity.id, identity.role).map_err(|e| {
        tracing::error!("token issuance failed: {}", e);
        ApiError::internal_server_error("failed to issue token")
    })?;

    tracing::info!(user = %identity.username, role = %identity.role, "login successful");

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_in": state.tokens.ttl_secs(),
        "identity": {
            "id": identity.id,
            "username": identity.username,
            "role": identity.role,
        }
    }))
    .with_message("login successful"))
}
