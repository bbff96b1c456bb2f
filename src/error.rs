// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

/// HTTP API error with appropriate status codes and client-friendly messages.
/// Typed layer errors (auth, storage, filter) convert into this at the top of
/// the handler stack; nothing below it swallows an error.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Convert to the standard error envelope: `{success: false, message}`,
    /// plus per-field detail for validation failures.
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError {
                message,
                field_errors,
            } => {
                let mut response = json!({
                    "success": false,
                    "message": message,
                });
                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }
                response
            }
            _ => {
                json!({
                    "success": false,
                    "message": self.message(),
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::auth::resolver::AuthError> for ApiError {
    fn from(err: crate::auth::resolver::AuthError) -> Self {
        use crate::auth::resolver::AuthError;
        match err {
            AuthError::NoToken
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::NotProvisioned => ApiError::unauthorized(err.to_string()),
            AuthError::InactiveAccount | AuthError::InsufficientPermissions => {
                ApiError::forbidden(err.to_string())
            }
            AuthError::Provider(msg) => {
                tracing::error!("identity provider error: {}", msg);
                ApiError::unauthorized("could not validate token with identity provider")
            }
            AuthError::Storage(db) => db.into(),
        }
    }
}

impl From<crate::auth::TokenError> for ApiError {
    fn from(err: crate::auth::TokenError) -> Self {
        crate::auth::resolver::AuthError::from(err).into()
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        use crate::database::manager::DatabaseError;
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConstraintViolation(hint) => ApiError::bad_request(hint),
            DatabaseError::Unavailable(msg) => {
                tracing::error!("storage backend unavailable: {}", msg);
                ApiError::internal_server_error("storage backend unavailable")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("database query error: {}", msg);
                ApiError::internal_server_error("an error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return a generic message
                tracing::error!("sqlx error: {}", sqlx_err);
                ApiError::internal_server_error("an error occurred while processing your request")
            }
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("database misconfiguration: {}", err);
                ApiError::internal_server_error("storage backend misconfigured")
            }
        }
    }
}

impl From<crate::filter::FilterError> for ApiError {
    fn from(err: crate::filter::FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::resolver::AuthError;
    use crate::database::manager::DatabaseError;

    #[test]
    fn auth_errors_map_to_spec_statuses() {
        assert_eq!(ApiError::from(AuthError::NoToken).status_code(), 401);
        assert_eq!(ApiError::from(AuthError::InvalidToken).status_code(), 401);
        assert_eq!(ApiError::from(AuthError::ExpiredToken).status_code(), 401);
        assert_eq!(ApiError::from(AuthError::NotProvisioned).status_code(), 401);
        assert_eq!(ApiError::from(AuthError::InactiveAccount).status_code(), 403);
        assert_eq!(
            ApiError::from(AuthError::InsufficientPermissions).status_code(),
            403
        );
    }

    #[test]
    fn storage_errors_map_to_spec_statuses() {
        assert_eq!(
            ApiError::from(DatabaseError::NotFound("x".into())).status_code(),
            404
        );
        assert_eq!(
            ApiError::from(DatabaseError::ConstraintViolation("dup".into())).status_code(),
            400
        );
        assert_eq!(
            ApiError::from(DatabaseError::Unavailable("down".into())).status_code(),
            500
        );
    }

    #[test]
    fn envelope_shape() {
        let body = ApiError::unauthorized("no authentication token provided").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "no authentication token provided");
    }

    #[test]
    fn validation_error_carries_field_detail() {
        let mut fields = HashMap::new();
        fields.insert("password".to_string(), "too short".to_string());
        let body = ApiError::validation_error("validation failed: password", Some(fields)).to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["field_errors"]["password"], "too short");
    }
}
