use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::password;
use crate::database::identities::NewIdentity;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

/// POST /auth/register - self-registration.
///
/// Creates student accounts only; staff and admin identities are provisioned
/// administratively. Input problems come back as one aggregated validation
/// error naming every failing field.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Value> {
    let mut field_errors = HashMap::new();
    let username = payload.username.trim();
    if username.len() < 3 {
        field_errors.insert(
            "username".to_string(),
            "must be at least 3 characters".to_string(),
        );
    }
    if payload.password.len() < 8 {
        field_errors.insert(
            "password".to_string(),
            "must be at least 8 characters".to_string(),
        );
    }
    if let Some(email) = &payload.email {
        if !email.contains('@') {
            field_errors.insert("email".to_string(), "must be a valid email".to_string());
        }
    }
    if !field_errors.is_empty() {
        let mut failing: Vec<&str> = field_errors.keys().map(|k| k.as_str()).collect();
        failing.sort();
        return Err(ApiError::validation_error(
            format!("validation failed: {}", failing.join(", ")),
            Some(field_errors),
        ));
    }

    let role = payload.role.unwrap_or(Role::Student);
    if role != Role::Student {
        return Err(ApiError::forbidden(
            "only student accounts can self-register",
        ));
    }

    let credential_hash = password::hash_password(&payload.password).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::internal_server_error("failed to create account")
    })?;

    let identity = state
        .identities
        .insert(NewIdentity {
            username: username.to_string(),
            email: payload.email,
            phone: payload.phone,
            credential_hash,
            role,
        })
        .await
        .map_err(ApiError::from)?;

    tracing::info!(user = %identity.username, "account registered");

    Ok(ApiResponse::created(json!({
        "id": identity.id,
        "username": identity.username,
        "role": identity.role,
        "status": identity.status,
    }))
    .with_message("account created"))
}
