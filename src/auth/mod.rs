pub mod password;
pub mod resolver;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::types::Role;

/// Claims carried by a bearer token. The role claim identifies what the
/// subject held at issuance; authorization always re-reads the stored role,
/// so a stale claim cannot widen access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,
}

/// Signs and verifies identity tokens. Pure given the secret and the clock;
/// construction fails on a missing secret so misconfiguration is fatal at
/// startup rather than per-request.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(security: &SecurityConfig) -> Result<Self, TokenError> {
        if security.token_secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        let mut validation = Validation::default();
        // A token is valid strictly while now < exp.
        validation.leeway = 0;
        Ok(Self {
            encoding: EncodingKey::from_secret(security.token_secret.as_bytes()),
            decoding: DecodingKey::from_secret(security.token_secret.as_bytes()),
            validation,
            ttl: Duration::hours(security.token_ttl_hours as i64),
        })
    }

    pub fn issue(&self, subject: Uuid, role: Role) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, role, self.ttl)
    }

    pub fn issue_with_ttl(
        &self,
        subject: Uuid,
        role: Role,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject,
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthStrategy;

    fn codec_with_secret(secret: &str) -> TokenCodec {
        TokenCodec::new(&SecurityConfig {
            token_secret: secret.to_string(),
            token_ttl_hours: 4,
            auth_strategy: AuthStrategy::Local,
            external_userinfo_url: None,
        })
        .unwrap()
    }

    #[test]
    fn empty_secret_is_fatal() {
        let result = TokenCodec::new(&SecurityConfig {
            token_secret: String::new(),
            token_ttl_hours: 4,
            auth_strategy: AuthStrategy::Local,
            external_userinfo_url: None,
        });
        assert!(matches!(result, Err(TokenError::MissingSecret)));
    }

    #[test]
    fn issue_verify_round_trip() {
        let codec = codec_with_secret("test-secret");
        let subject = Uuid::new_v4();
        let token = codec.issue(subject, Role::Teacher).unwrap();
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.role, Role::Teacher);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let codec = codec_with_secret("test-secret");
        let token = codec.issue(Uuid::new_v4(), Role::Student).unwrap();

        // Flip one character in the payload segment; the signature no longer
        // matches, so verification must fail rather than yield altered claims.
        let payload_start = token.find('.').unwrap() + 1;
        let mut chars: Vec<char> = token.chars().collect();
        let i = payload_start + 5;
        chars[i] = if chars[i] == 'a' { 'b' } else { 'a' };
        let tampered: String = chars.into_iter().collect();

        assert!(matches!(codec.verify(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let codec = codec_with_secret("test-secret");
        let token = codec.issue(Uuid::new_v4(), Role::Student).unwrap();
        let truncated = &token[..token.len() - 2];
        assert!(matches!(codec.verify(truncated), Err(TokenError::Invalid)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = codec_with_secret("secret-one");
        let verifier = codec_with_secret("secret-two");
        let token = issuer.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert!(matches!(verifier.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn expired_token_is_distinguished() {
        let codec = codec_with_secret("test-secret");
        let token = codec
            .issue_with_ttl(Uuid::new_v4(), Role::Student, Duration::hours(-1))
            .unwrap();
        assert!(matches!(codec.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn garbage_is_invalid_not_expired() {
        let codec = codec_with_secret("test-secret");
        assert!(matches!(codec.verify("not.a.token"), Err(TokenError::Invalid)));
        assert!(matches!(codec.verify(""), Err(TokenError::Invalid)));
    }
}
