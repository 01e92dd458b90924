use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, PasswordCredential};
use crate::auth::{hash_token, Identity, RefreshTokenRecord};
use crate::error::{AppError, DatabaseError};

/// Postgres-backed credential store
///
/// Refresh tokens are stored as their SHA-256 hash; the plaintext only
/// ever exists on the client.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Register a new identity under `email` with its password credential
    ///
    /// # Errors
    /// `UniqueConstraintViolation` if the email is taken
    pub async fn create_user(&self, email: &str, hashed_password: &str) -> Result<Identity, AppError> {
        let identity = Identity::new();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, hashed_password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::from(identity))
        .bind(email)
        .bind(hashed_password)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                AppError::Database(DatabaseError::UniqueConstraintViolation(
                    "Email already registered".to_string(),
                ))
            }
            other => other,
        })?;

        tracing::info!(user_id = %identity, "User created");
        Ok(identity)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_refresh_token(
        &self,
        token: &str,
        owner: Identity,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(hash_token(token))
        .bind(Uuid::from(owner))
        .bind(created_at)
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>, DateTime<Utc>, DateTime<Utc>, Option<DateTime<Utc>>)>(
            r#"
            SELECT user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(user_id, created_at, updated_at, expires_at, revoked_at)| RefreshTokenRecord {
                owner: Identity::from(user_id),
                created_at,
                updated_at,
                expires_at,
                revoked_at,
            },
        ))
    }

    async fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1, updated_at = $1
            WHERE token_hash = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(at)
        .bind(hash_token(token))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn revoke_all_refresh_tokens(
        &self,
        owner: Identity,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1, updated_at = $1
            WHERE user_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(at)
        .bind(Uuid::from(owner))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_identity_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<Identity>, AppError> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT users.id
            FROM users
            INNER JOIN refresh_tokens ON refresh_tokens.user_id = users.id
            WHERE refresh_tokens.token_hash = $1
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id.map(Identity::from))
    }

    async fn get_password_credential(
        &self,
        email: &str,
    ) -> Result<Option<PasswordCredential>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, hashed_password)| PasswordCredential {
            identity: Identity::from(id),
            hashed_password,
        }))
    }
}
