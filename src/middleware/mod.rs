/// Middleware module
///
/// actix-web adapters that put the credential core in front of routes.

mod access_token;

pub use access_token::AccessTokenMiddleware;
