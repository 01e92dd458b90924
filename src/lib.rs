//! Authentication and credential-lifecycle core for the Chirpy service.
//!
//! Handlers call into [`auth::Authenticator`] to turn raw `Authorization`
//! headers into an [`auth::Identity`] and to decide what that identity may do.

pub mod auth;
pub mod configuration;
pub mod error;
pub mod middleware;
pub mod storage;
pub mod telemetry;
