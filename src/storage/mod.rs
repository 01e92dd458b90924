/// Credential storage
///
/// The core never touches a database directly; it talks to a
/// `CredentialStore`. Each call is one atomic row operation with no retry.

mod memory;
mod postgres;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::{Identity, RefreshTokenRecord};
use crate::error::AppError;

/// A stored password credential and the identity it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCredential {
    pub identity: Identity,
    /// PHC-encoded Argon2id hash
    pub hashed_password: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create_refresh_token(
        &self,
        token: &str,
        owner: Identity,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Mark a token revoked at `at`; returns the number of rows changed (0 or 1)
    async fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<u64, AppError>;

    /// Revoke every live token of `owner`; returns how many were revoked
    async fn revoke_all_refresh_tokens(
        &self,
        owner: Identity,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    async fn get_identity_by_refresh_token(&self, token: &str)
        -> Result<Option<Identity>, AppError>;

    /// Look up the credential registered under `email`
    async fn get_password_credential(
        &self,
        email: &str,
    ) -> Result<Option<PasswordCredential>, AppError>;
}
