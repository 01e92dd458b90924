/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 bytes from a CSPRNG, hex-encoded (64 lowercase characters)
/// - Persisted by the credential store with a 60-day expiry
/// - Never rotated on use; only revocation ends them early

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::auth::Identity;
use crate::error::{AppError, AuthError};
use crate::storage::CredentialStore;

pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

const TOKEN_BYTES: usize = 32;

/// A persisted refresh token as the store reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub owner: Identity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// A fresh, unrevoked record created at `now`
    pub fn new(owner: Identity, now: DateTime<Utc>) -> Self {
        Self {
            owner,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            revoked_at: None,
        }
    }

    /// Check that the token may still be exchanged at `now`
    ///
    /// Revocation and expiry are independent; either one disqualifies.
    ///
    /// # Errors
    /// `TokenRevoked` or `TokenExpired`
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        if self.revoked_at.is_some() {
            return Err(AuthError::TokenRevoked);
        }
        if now >= self.expires_at {
            return Err(AuthError::TokenExpired);
        }
        Ok(self.owner)
    }
}

/// Generate a new refresh token
///
/// The plaintext goes to the client; see `hash_token` for what may be stored.
pub fn mint_refresh_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of a refresh token, hex-encoded
///
/// Stores that persist tokens outside the process key them by this.
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Persist `token` for `owner` with a 60-day expiry starting at `now`
///
/// # Errors
/// Returns error if the store rejects the write
pub async fn save_refresh_token(
    store: &dyn CredentialStore,
    token: &str,
    owner: Identity,
    now: DateTime<Utc>,
) -> Result<RefreshTokenRecord, AppError> {
    let record = RefreshTokenRecord::new(owner, now);

    store
        .create_refresh_token(token, owner, record.created_at, record.expires_at)
        .await?;

    tracing::debug!(user_id = %owner, expires_at = %record.expires_at, "Refresh token stored");
    Ok(record)
}

/// Revoke a single refresh token
///
/// Idempotent: unknown or already-revoked tokens are not an error.
///
/// # Errors
/// Returns error only if the store itself fails
pub async fn revoke_refresh_token(
    store: &dyn CredentialStore,
    token: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let affected = store.revoke_refresh_token(token, now).await?;

    if affected == 0 {
        tracing::debug!("Revocation matched no live refresh token");
    } else {
        tracing::info!("Refresh token revoked");
    }
    Ok(())
}
