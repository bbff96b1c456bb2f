use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::database::models::Identity;
use crate::error::ApiError;
use crate::middleware::auth::AuthIdentity;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/auth/whoami - the identity resolved for this request, as stored.
pub async fn whoami(Extension(identity): Extension<Identity>) -> ApiResult<Identity> {
    Ok(ApiResponse::success(identity))
}

/// POST /api/auth/refresh - issue a fresh token for the current identity.
///
/// The new token carries the role the middleware just re-read from storage,
/// not the claim from the presented token, so a refresh never extends stale
/// privileges. Tokens are stateless; there is nothing to revoke server-side.
pub async fn refresh(
    State(state): State<AppState>,
    identity: AuthIdentity,
) -> ApiResult<Value> {
    let token = state.tokens.issue(identity.id, identity.role).map_err(|e| {
        tracing::error!("token issuance failed: {}", e);
        ApiError::internal_server_error("failed to issue token")
    })?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_in": state.tokens.ttl_secs(),
    }))
    .with_message("token refreshed"))
}
