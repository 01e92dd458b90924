use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{CredentialStore, PasswordCredential};
use crate::auth::{Identity, RefreshTokenRecord};
use crate::error::{AppError, DatabaseError};

#[derive(Default)]
struct Tables {
    /// Keyed by email
    users: HashMap<String, PasswordCredential>,
    /// Keyed by plaintext token; nothing leaves the process
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// Process-local credential store for tests and single-node embedding
#[derive(Default)]
pub struct InMemoryCredentialStore {
    tables: Mutex<Tables>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables.lock().map_err(|_| {
            AppError::Database(DatabaseError::UnexpectedError(
                "credential store lock poisoned".to_string(),
            ))
        })
    }

    /// Register a new identity under `email`
    ///
    /// # Errors
    /// `UniqueConstraintViolation` if the email is taken
    pub fn insert_user(&self, email: &str, hashed_password: &str) -> Result<Identity, AppError> {
        let mut tables = self.lock()?;
        if tables.users.contains_key(email) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )));
        }

        let identity = Identity::new();
        tables.users.insert(
            email.to_string(),
            PasswordCredential {
                identity,
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(identity)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_refresh_token(
        &self,
        token: &str,
        owner: Identity,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        if tables.refresh_tokens.contains_key(token) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "Refresh token already exists".to_string(),
            )));
        }

        tables.refresh_tokens.insert(
            token.to_string(),
            RefreshTokenRecord {
                owner,
                created_at,
                updated_at: created_at,
                expires_at,
                revoked_at: None,
            },
        );
        Ok(())
    }

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(self.lock()?.refresh_tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.lock()?;
        match tables.refresh_tokens.get_mut(token) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(at);
                record.updated_at = at;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn revoke_all_refresh_tokens(
        &self,
        owner: Identity,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut tables = self.lock()?;
        let mut revoked = 0;
        for record in tables.refresh_tokens.values_mut() {
            if record.owner == owner && record.revoked_at.is_none() {
                record.revoked_at = Some(at);
                record.updated_at = at;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn get_identity_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<Identity>, AppError> {
        Ok(self.lock()?.refresh_tokens.get(token).map(|r| r.owner))
    }

    async fn get_password_credential(
        &self,
        email: &str,
    ) -> Result<Option<PasswordCredential>, AppError> {
        Ok(self.lock()?.users.get(email).cloned())
    }
}
