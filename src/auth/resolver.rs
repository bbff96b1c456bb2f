use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

use crate::auth::{Claims, TokenError};
use crate::database::identities::IdentityStore;
use crate::database::manager::DatabaseError;
use crate::database::models::Identity;

/// Failures along the authentication/authorization chain. Token problems map
/// to 401, account-state and permission problems to 403.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no authentication token provided")]
    NoToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("account is not active")]
    InactiveAccount,

    #[error("no account is provisioned for this identity")]
    NotProvisioned,

    #[error("insufficient permissions")]
    InsufficientPermissions,

    #[error("identity provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        }
    }
}

/// Profile returned by the external identity provider. Email is the stable
/// key used to match a provisioned internal identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalProfile {
    pub email: String,
}

/// Validates externally-issued bearer tokens. A trait seam so tests can
/// substitute a canned provider.
#[async_trait]
pub trait ExternalIdentityProvider: Send + Sync {
    async fn userinfo(&self, token: &str) -> Result<ExternalProfile, AuthError>;
}

/// Provider backed by an HTTP userinfo endpoint.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    userinfo_url: String,
}

impl HttpIdentityProvider {
    pub fn new(userinfo_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            userinfo_url,
        }
    }
}

#[async_trait]
impl ExternalIdentityProvider for HttpIdentityProvider {
    async fn userinfo(&self, token: &str) -> Result<ExternalProfile, AuthError> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "userinfo endpoint returned {}",
                status
            )));
        }

        let profile: ExternalProfile = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        if profile.email.is_empty() {
            return Err(AuthError::Provider(
                "userinfo response missing email".to_string(),
            ));
        }
        Ok(profile)
    }
}

/// Maps a verified token to a stored identity.
///
/// One strategy applies uniformly: the token (local claims or external
/// bearer) only identifies the subject; role and status are re-read from
/// storage on every request, so a role change takes effect on the next
/// request even for tokens issued earlier.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    provider: Option<Arc<dyn ExternalIdentityProvider>>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            store,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ExternalIdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Resolve locally-issued claims: look the subject up by id and gate on
    /// current status.
    pub async fn resolve_claims(&self, claims: &Claims) -> Result<Identity, AuthError> {
        let identity = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::NotProvisioned)?;
        if !identity.status.is_active() {
            return Err(AuthError::InactiveAccount);
        }
        Ok(identity)
    }

    /// Resolve an externally-issued token: the provider validates it and
    /// yields an email, which must match a provisioned identity.
    pub async fn resolve_external(&self, token: &str) -> Result<Identity, AuthError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| AuthError::Provider("no external provider configured".to_string()))?;

        let profile = provider.userinfo(token).await?;
        tracing::debug!(
            token = %token_fingerprint(token),
            email = %profile.email,
            "external token validated"
        );

        let identity = self
            .store
            .find_by_email(&profile.email)
            .await?
            .ok_or(AuthError::NotProvisioned)?;
        if !identity.status.is_active() {
            return Err(AuthError::InactiveAccount);
        }
        Ok(identity)
    }
}

/// Short stable digest of a token for audit logs; raw tokens are never logged.
fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = token_fingerprint("abc");
        let b = token_fingerprint("abc");
        let c = token_fingerprint("abd");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }
}
