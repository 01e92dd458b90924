/// Access Token Claims
///
/// The payload of an access token: who it speaks for, who minted it,
/// and the window in which it is valid. Nothing else is carried.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::error::AuthError;

/// Issuer tag stamped into every access token
pub const ACCESS_TOKEN_ISSUER: &str = "chirpy-access";

/// Access tokens live exactly one hour
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (identity as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Build claims for `identity` issued at `now`
    pub fn new(identity: Identity, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            iss: ACCESS_TOKEN_ISSUER.to_string(),
            sub: identity.to_string(),
            iat,
            exp: iat + ACCESS_TOKEN_TTL_SECONDS,
        }
    }

    /// Parse the subject back into an identity
    ///
    /// # Errors
    /// `MalformedSubject` if the subject is not a UUID
    pub fn identity(&self) -> Result<Identity, AuthError> {
        self.sub.parse().map_err(|_| AuthError::MalformedSubject)
    }

    /// Expired once `now` reaches `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn has_expected_issuer(&self) -> bool {
        self.iss == ACCESS_TOKEN_ISSUER
    }
}
