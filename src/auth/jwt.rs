/// Access Token Generation and Validation
///
/// Access tokens are HS256 JWTs: three dot-separated base64url segments.
/// They are never persisted; validity is signature + claims + clock.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::auth::Identity;
use crate::error::{AppError, AuthError};

/// Issue a one-hour access token for `identity`
///
/// # Errors
/// Returns error if token encoding fails
pub fn issue_access_token(identity: Identity, secret: &[u8]) -> Result<String, AppError> {
    issue_access_token_at(identity, secret, Utc::now())
}

/// Issue an access token as if the current time were `now`
pub fn issue_access_token_at(
    identity: Identity,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = Claims::new(identity, now);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return the identity it speaks for
///
/// # Errors
/// `SignatureInvalid`, `TokenExpired`, `WrongIssuer` or `MalformedSubject`,
/// checked in that order
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<Identity, AuthError> {
    validate_access_token_at(token, secret, Utc::now())
}

/// Validate an access token against the instant `now`
pub fn validate_access_token_at(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry and issuer are checked below against the caller's clock
    validation.validate_exp = false;
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(kind = ?e.kind(), "Access token failed integrity check");
            AuthError::SignatureInvalid
        })?;

    if claims.is_expired_at(now) {
        return Err(AuthError::TokenExpired);
    }

    if !claims.has_expected_issuer() {
        tracing::warn!(issuer = %claims.iss, "Access token from unexpected issuer");
        return Err(AuthError::WrongIssuer);
    }

    claims.identity()
}
