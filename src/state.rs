use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::resolver::{HttpIdentityProvider, IdentityResolver};
use crate::auth::{TokenCodec, TokenError};
use crate::config::{AppConfig, AuthStrategy};
use crate::database::identities::{IdentityStore, PgIdentityStore};

/// Shared, read-only application state. Constructed once at startup and
/// cloned into handlers; nothing in it is mutated after construction.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub tokens: TokenCodec,
    pub identities: Arc<dyn IdentityStore>,
    pub resolver: IdentityResolver,
}

impl AppState {
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, TokenError> {
        let identities: Arc<dyn IdentityStore> = Arc::new(PgIdentityStore::new(pool.clone()));
        Self::with_store(config, pool, identities)
    }

    /// Build state over an explicit identity store - tests substitute an
    /// in-memory implementation here.
    pub fn with_store(
        config: AppConfig,
        pool: PgPool,
        identities: Arc<dyn IdentityStore>,
    ) -> Result<Self, TokenError> {
        let tokens = TokenCodec::new(&config.security)?;
        let mut resolver = IdentityResolver::new(identities.clone());
        if config.security.auth_strategy == AuthStrategy::External {
            if let Some(url) = &config.security.external_userinfo_url {
                resolver = resolver.with_provider(Arc::new(HttpIdentityProvider::new(url.clone())));
            }
        }
        Ok(Self {
            config: Arc::new(config),
            pool,
            tokens,
            identities,
            resolver,
        })
    }
}
