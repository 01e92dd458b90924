/// Authorization Policy
///
/// Decides whether a request may act as an identity, and whether that
/// identity may act on a resource. Failures to prove an identity and
/// refusals for a proven identity are different `AuthError` kinds and
/// must not be merged by callers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::extract::{api_key_from_header, bearer_from_header};
use crate::auth::jwt::{issue_access_token_at, validate_access_token_at};
use crate::auth::password::PasswordHasher;
use crate::auth::refresh_token::{mint_refresh_token, revoke_refresh_token, save_refresh_token};
use crate::auth::{Identity, ACCESS_TOKEN_TTL_SECONDS};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, ConfigError};
use crate::storage::CredentialStore;

/// Tokens handed out on a successful login
#[derive(Debug, Serialize)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Bearer header → access token → identity
///
/// # Errors
/// `MalformedHeader`, `SignatureInvalid`, `TokenExpired`, `WrongIssuer`
/// or `MalformedSubject`
pub fn authenticate_access_token(
    header: Option<&str>,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    let token = bearer_from_header(header)?;
    validate_access_token_at(&token, secret, now)
}

/// Allow `actor` to act on a resource only if it owns it
///
/// # Errors
/// `PermissionDenied` when `actor` is not `owner`
pub fn authorize_ownership(actor: Identity, owner: Identity) -> Result<(), AuthError> {
    if actor == owner {
        Ok(())
    } else {
        tracing::warn!(user_id = %actor, owner_id = %owner, "Ownership check failed");
        Err(AuthError::PermissionDenied)
    }
}

/// Check an `ApiKey` header against the trusted integration's key
///
/// # Errors
/// `MalformedHeader` if no key can be extracted, `InvalidApiKey` on mismatch
pub fn authorize_integration_key(header: Option<&str>, expected: &str) -> Result<(), AuthError> {
    let presented = api_key_from_header(header)?;

    if constant_time_eq(&presented, expected) {
        Ok(())
    } else {
        tracing::warn!("Integration request with wrong API key");
        Err(AuthError::InvalidApiKey)
    }
}

/// Compare digests so neither content nor length leaks through timing
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Credential core bound to a store, secrets and a clock
///
/// Constructed once at startup and cloned into every worker; all state it
/// shares is either immutable or owned by the store.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    signing_secret: Arc<[u8]>,
    integration_key: Arc<str>,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    /// # Errors
    /// `ConfigError::MissingRequired` if the signing secret or the
    /// integration key is empty
    pub fn new(store: Arc<dyn CredentialStore>, settings: &AuthSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        Ok(Self {
            store,
            signing_secret: Arc::from(settings.signing_secret.as_bytes()),
            integration_key: Arc::from(settings.integration_api_key.as_str()),
            hasher: PasswordHasher::new(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue a fresh access token for `identity`
    pub fn issue_access_token(&self, identity: Identity) -> Result<String, AppError> {
        issue_access_token_at(identity, &self.signing_secret, self.now())
    }

    pub fn authenticate_access_token(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        authenticate_access_token(header, &self.signing_secret, self.now())
    }

    /// Bearer header → stored refresh token → owning identity
    ///
    /// The refresh token is left as is; it is not rotated.
    ///
    /// # Errors
    /// `MalformedHeader`, `TokenNotFound`, `TokenRevoked` or `TokenExpired`,
    /// or a storage error
    pub async fn authenticate_refresh_token(
        &self,
        header: Option<&str>,
    ) -> Result<Identity, AppError> {
        let token = bearer_from_header(header)?;

        let record = self
            .store
            .get_refresh_token(&token)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        if let Err(e) = record.check_usable(self.now()) {
            tracing::warn!(user_id = %record.owner, code = e.code(), "Refresh token rejected");
            return Err(e.into());
        }

        let identity = self
            .store
            .get_identity_by_refresh_token(&token)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        tracing::debug!(user_id = %identity, "Refresh token accepted");
        Ok(identity)
    }

    pub fn authorize_ownership(&self, actor: Identity, owner: Identity) -> Result<(), AuthError> {
        authorize_ownership(actor, owner)
    }

    pub fn authorize_integration_key(&self, header: Option<&str>) -> Result<(), AuthError> {
        authorize_integration_key(header, &self.integration_key)
    }

    /// Email + password → new session
    ///
    /// A wrong password stops here; no token is issued. An unknown email
    /// costs the same hashing work as a known one.
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown email or wrong password
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let credential = match self.store.get_password_credential(email).await? {
            Some(credential) => credential,
            None => {
                self.hasher.verify_absent(password)?;
                tracing::warn!("Login for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !self.hasher.verify(password, &credential.hashed_password)? {
            tracing::warn!(user_id = %credential.identity, "Login with incorrect password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let identity = credential.identity;
        let now = self.now();
        let access_token = issue_access_token_at(identity, &self.signing_secret, now)?;
        let refresh_token = mint_refresh_token();
        save_refresh_token(self.store.as_ref(), &refresh_token, identity, now).await?;

        tracing::info!(user_id = %identity, "User logged in successfully");

        Ok(Session {
            identity,
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: ACCESS_TOKEN_TTL_SECONDS,
        })
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, header: Option<&str>) -> Result<String, AppError> {
        let identity = self.authenticate_refresh_token(header).await?;
        let access_token = self.issue_access_token(identity)?;

        tracing::info!(user_id = %identity, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke the refresh token presented in `header`
    ///
    /// # Errors
    /// `MalformedHeader` if no token can be extracted, or a storage error
    pub async fn revoke(&self, header: Option<&str>) -> Result<(), AppError> {
        let token = bearer_from_header(header)?;
        revoke_refresh_token(self.store.as_ref(), &token, self.now()).await
    }

    /// Revoke every live refresh token of `identity`
    pub async fn revoke_all(&self, identity: Identity) -> Result<u64, AppError> {
        let revoked = self
            .store
            .revoke_all_refresh_tokens(identity, self.now())
            .await?;

        tracing::info!(user_id = %identity, revoked, "All refresh tokens revoked for user");
        Ok(revoked)
    }
}
