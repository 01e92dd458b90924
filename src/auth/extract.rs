/// Authorization header parsing
///
/// Only the shape of the header is checked here: exactly two parts
/// separated by a single space. What the second part is worth is decided
/// by the validators and the policy.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

fn second_segment(header: Option<&str>) -> Result<String, AuthError> {
    let header = header.ok_or(AuthError::MalformedHeader)?;
    let parts: Vec<&str> = header.split(' ').collect();

    match parts.as_slice() {
        [_scheme, credential] => Ok((*credential).to_string()),
        _ => Err(AuthError::MalformedHeader),
    }
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
}

/// `Bearer <token>` → `<token>`
///
/// # Errors
/// `MalformedHeader` if the header is missing or not two space-separated parts
pub fn bearer_from_header(header: Option<&str>) -> Result<String, AuthError> {
    second_segment(header)
}

/// `ApiKey <key>` → `<key>`
///
/// # Errors
/// `MalformedHeader` if the header is missing or not two space-separated parts
pub fn api_key_from_header(header: Option<&str>) -> Result<String, AuthError> {
    second_segment(header)
}

/// Bearer token from a request's `Authorization` header
pub fn bearer_from_headers(headers: &HeaderMap) -> Result<String, AuthError> {
    bearer_from_header(authorization(headers))
}

/// API key from a request's `Authorization` header
pub fn api_key_from_headers(headers: &HeaderMap) -> Result<String, AuthError> {
    api_key_from_header(authorization(headers))
}
