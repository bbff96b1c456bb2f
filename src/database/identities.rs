use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Identity;
use crate::types::Role;

/// Fields accepted when provisioning a new identity. Status starts `active`;
/// id and timestamps are generated by storage.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub credential_hash: String,
    pub role: Role,
}

/// Storage seam for identities. The resolver and the auth handlers depend on
/// this trait rather than on the pool, so tests can substitute an in-memory
/// implementation.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, DatabaseError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, DatabaseError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, DatabaseError>;
    async fn insert(&self, new: NewIdentity) -> Result<Identity, DatabaseError>;
}

const IDENTITY_COLUMNS: &str =
    "id, username, email, phone, credential_hash, role, status, created_at, updated_at";

pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, DatabaseError> {
        let sql = format!("SELECT {} FROM identities WHERE id = $1", IDENTITY_COLUMNS);
        sqlx::query_as::<_, Identity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM identities WHERE username = $1",
            IDENTITY_COLUMNS
        );
        sqlx::query_as::<_, Identity>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, DatabaseError> {
        let sql = format!("SELECT {} FROM identities WHERE email = $1", IDENTITY_COLUMNS);
        sqlx::query_as::<_, Identity>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn insert(&self, new: NewIdentity) -> Result<Identity, DatabaseError> {
        let sql = format!(
            "INSERT INTO identities (username, email, phone, credential_hash, role, status) \
             VALUES ($1, $2, $3, $4, $5, 'active') RETURNING {}",
            IDENTITY_COLUMNS
        );
        sqlx::query_as::<_, Identity>(&sql)
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(&new.credential_hash)
            .bind(new.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }
}
