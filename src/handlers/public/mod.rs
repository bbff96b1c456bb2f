pub mod auth;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::middleware::auth::MaybeIdentity;
use crate::state::AppState;

/// GET / - service banner. Optionally authenticated: with a valid token the
/// response reflects the caller's identity, without one it degrades quietly.
pub async fn root(MaybeIdentity(identity): MaybeIdentity) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    let mut data = json!({
        "name": "Campus API",
        "version": version,
        "description": "School management backend API built with Rust (Axum)",
        "authenticated": identity.is_some(),
        "endpoints": {
            "home": "/ (public, optional auth)",
            "auth": "/auth/login, /auth/register (public - token acquisition)",
            "session": "/api/auth/whoami, /api/auth/refresh (protected)",
            "data": "/api/data/:entity[/:id] (protected)",
            "find": "/api/find/:entity (protected)",
        }
    });
    if let Some(identity) = identity {
        data["identity"] = json!({
            "id": identity.id,
            "role": identity.role,
        });
    }

    Json(json!({ "success": true, "message": "ok", "data": data }))
}

/// GET /health - liveness plus database reachability.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "ok",
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "message": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
