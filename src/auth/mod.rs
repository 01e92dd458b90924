/// Authentication module
///
/// Password hashing, access token issue/validation, refresh token
/// management, header extraction and the authorization policy that
/// composes them.

mod claims;
pub mod clock;
mod extract;
mod identity;
mod jwt;
mod password;
mod policy;
mod refresh_token;

pub use claims::{Claims, ACCESS_TOKEN_ISSUER, ACCESS_TOKEN_TTL_SECONDS};
pub use clock::{Clock, FixedClock, SystemClock};
pub use extract::{api_key_from_header, api_key_from_headers, bearer_from_header, bearer_from_headers};
pub use identity::Identity;
pub use jwt::{issue_access_token, issue_access_token_at, validate_access_token, validate_access_token_at};
pub use password::{hash_password, verify_password, PasswordHasher};
pub use policy::{
    authenticate_access_token, authorize_integration_key, authorize_ownership, Authenticator, Session,
};
pub(crate) use refresh_token::hash_token;
pub use refresh_token::{
    mint_refresh_token, revoke_refresh_token, save_refresh_token, RefreshTokenRecord,
    REFRESH_TOKEN_TTL_DAYS,
};
