use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::resolver::AuthError;
use crate::config::AuthStrategy;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Role;

/// Cookie consulted when no Authorization header is present.
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated principal attached to the request context. Inserted exactly
/// once by [`authenticate`]; nothing downstream overwrites it.
#[derive(Clone, Debug)]
pub struct AuthIdentity {
    pub id: Uuid,
    pub role: Role,
}

/// Per-request pipeline: extract token, resolve identity against current
/// stored state, attach the identity to the request, or reject.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())?;
    let identity = match state.config.security.auth_strategy {
        AuthStrategy::Local => {
            let claims = state.tokens.verify(&token).map_err(AuthError::from)?;
            state.resolver.resolve_claims(&claims).await?
        }
        AuthStrategy::External => state.resolver.resolve_external(&token).await?,
    };

    request.extensions_mut().insert(AuthIdentity {
        id: identity.id,
        role: identity.role,
    });
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Same pipeline, but a missing or unusable token leaves the context identity
/// unset instead of rejecting, for public routes with degraded access.
pub async fn optional_authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = match extract_token(request.headers()) {
        Ok(token) => match state.config.security.auth_strategy {
            AuthStrategy::Local => match state.tokens.verify(&token) {
                Ok(claims) => state.resolver.resolve_claims(&claims).await.ok(),
                Err(_) => None,
            },
            AuthStrategy::External => state.resolver.resolve_external(&token).await.ok(),
        },
        Err(_) => None,
    };

    if let Some(identity) = resolved {
        request.extensions_mut().insert(AuthIdentity {
            id: identity.id,
            role: identity.role,
        });
        request.extensions_mut().insert(identity);
    }

    next.run(request).await
}

/// Extract the bearer token. The Authorization header takes precedence over
/// the `token` cookie; a present-but-malformed header is an invalid token,
/// not a fallback to the cookie.
fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidToken)?;
        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?
            .trim();
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        return Ok(token.to_string());
    }

    if let Some(token) = token_from_cookies(headers) {
        return Ok(token);
    }

    Err(AuthError::NoToken)
}

fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(TOKEN_COOKIE) {
            let value = parts.next().unwrap_or("").trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// `true` when `role` passes the allow-list; an empty list admits any
/// authenticated identity.
pub fn role_allowed(role: Role, allow: &[Role]) -> bool {
    allow.is_empty() || allow.contains(&role)
}

fn check_role(identity: &AuthIdentity, allow: &[Role]) -> Result<(), ApiError> {
    if role_allowed(identity.role, allow) {
        Ok(())
    } else {
        Err(ApiError::forbidden("insufficient permissions"))
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthIdentity>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("authentication required"))
    }
}

/// Optional variant for routes behind [`optional_authenticate`].
#[derive(Clone, Debug)]
pub struct MaybeIdentity(pub Option<AuthIdentity>);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(parts.extensions.get::<AuthIdentity>().cloned()))
    }
}

/// Route allow-list: teacher, admin, or super_admin.
pub struct RequireStaff(pub AuthIdentity);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireStaff {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = AuthIdentity::from_request_parts(parts, state).await?;
        check_role(&identity, Role::STAFF)?;
        Ok(RequireStaff(identity))
    }
}

/// Route allow-list: admin or super_admin.
pub struct RequireAdmin(pub AuthIdentity);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = AuthIdentity::from_request_parts(parts, state).await?;
        check_role(&identity, Role::ADMINS)?;
        Ok(RequireAdmin(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn bearer_header_wins() {
        let h = headers(&[
            ("authorization", "Bearer abc123"),
            ("cookie", "token=fromcookie"),
        ]);
        assert_eq!(extract_token(&h).unwrap(), "abc123");
    }

    #[test]
    fn cookie_is_fallback() {
        let h = headers(&[("cookie", "theme=dark; token=abc123; lang=en")]);
        assert_eq!(extract_token(&h).unwrap(), "abc123");
    }

    #[test]
    fn malformed_header_does_not_fall_back() {
        let h = headers(&[("authorization", "Basic abc123"), ("cookie", "token=good")]);
        assert!(matches!(extract_token(&h), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn empty_bearer_is_invalid() {
        let h = headers(&[("authorization", "Bearer   ")]);
        assert!(matches!(extract_token(&h), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn nothing_present_is_no_token() {
        assert!(matches!(extract_token(&HeaderMap::new()), Err(AuthError::NoToken)));
    }

    #[test]
    fn role_gate_truth_table() {
        // Empty allow-list admits any authenticated identity.
        for role in [Role::Student, Role::Teacher, Role::Admin, Role::SuperAdmin] {
            assert!(role_allowed(role, &[]));
        }
        assert!(role_allowed(Role::Teacher, Role::STAFF));
        assert!(role_allowed(Role::Admin, Role::STAFF));
        assert!(role_allowed(Role::SuperAdmin, Role::STAFF));
        assert!(!role_allowed(Role::Student, Role::STAFF));
        assert!(role_allowed(Role::Admin, Role::ADMINS));
        assert!(role_allowed(Role::SuperAdmin, Role::ADMINS));
        assert!(!role_allowed(Role::Teacher, Role::ADMINS));
        assert!(!role_allowed(Role::Student, Role::ADMINS));
    }
}
