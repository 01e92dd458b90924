/// Error Handling Module
///
/// One error taxonomy for the whole credential core:
/// 1. Authentication / authorization failures (`AuthError`)
/// 2. Storage failures (`DatabaseError`)
/// 3. Configuration failures (`ConfigError`)
/// 4. The unified `AppError` and its HTTP response mapping
///
/// Authentication failures ("who are you?") and authorization failures
/// ("you may not do that") stay distinct all the way to the response.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// How a failure should be surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request did not prove an identity (401)
    Unauthenticated,
    /// The identity is known but not allowed to act (403)
    Forbidden,
    /// Something broke on our side (500)
    Internal,
}

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Hashing failed for a reason unrelated to the plaintext
    Hash(String),
    MalformedHeader,
    SignatureInvalid,
    TokenExpired,
    WrongIssuer,
    MalformedSubject,
    TokenNotFound,
    TokenRevoked,
    PermissionDenied,
    InvalidApiKey,
    /// Unknown email or wrong password; deliberately indistinguishable
    InvalidCredentials,
}

impl AuthError {
    pub fn outcome(&self) -> Outcome {
        match self {
            AuthError::Hash(_) => Outcome::Internal,
            AuthError::PermissionDenied => Outcome::Forbidden,
            _ => Outcome::Unauthenticated,
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Hash(_) => "HASH_ERROR",
            AuthError::MalformedHeader => "MALFORMED_HEADER",
            AuthError::SignatureInvalid => "SIGNATURE_INVALID",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::WrongIssuer => "WRONG_ISSUER",
            AuthError::MalformedSubject => "MALFORMED_SUBJECT",
            AuthError::TokenNotFound => "TOKEN_NOT_FOUND",
            AuthError::TokenRevoked => "TOKEN_REVOKED",
            AuthError::PermissionDenied => "PERMISSION_DENIED",
            AuthError::InvalidApiKey => "INVALID_API_KEY",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Hash(msg) => write!(f, "Password hashing failed: {}", msg),
            AuthError::MalformedHeader => write!(f, "Malformed authorization header"),
            AuthError::SignatureInvalid => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::WrongIssuer => write!(f, "Token issuer is not accepted"),
            AuthError::MalformedSubject => write!(f, "Token subject is not a valid identity"),
            AuthError::TokenNotFound => write!(f, "Refresh token not found"),
            AuthError::TokenRevoked => write!(f, "Refresh token has been revoked"),
            AuthError::PermissionDenied => write!(f, "Permission denied"),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
            AuthError::InvalidCredentials => write!(f, "Incorrect email or password"),
        }
    }
}

impl StdError for AuthError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    Database(DatabaseError),
    Config(ConfigError),
    Internal(String),
}

impl AppError {
    pub fn outcome(&self) -> Outcome {
        match self {
            AppError::Auth(e) => e.outcome(),
            _ => Outcome::Internal,
        }
    }

    /// The authentication error, if that is what this is
    pub fn as_auth(&self) -> Option<&AuthError> {
        match self {
            AppError::Auth(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("duplicate key") || error_msg.contains("unique constraint") {
            AppError::Database(DatabaseError::UniqueConstraintViolation(
                "Record already exists".to_string(),
            ))
        } else if error_msg.contains("pool") || error_msg.contains("connect") {
            AppError::Database(DatabaseError::ConnectionPool(error_msg))
        } else {
            AppError::Database(DatabaseError::UnexpectedError(error_msg))
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(ConfigError::ParseError(err.to_string()))
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Auth(e) => match e.outcome() {
                Outcome::Unauthenticated => (StatusCode::UNAUTHORIZED, e.code(), e.to_string()),
                Outcome::Forbidden => (StatusCode::FORBIDDEN, e.code(), e.to_string()),
                // Never echo hashing internals
                Outcome::Internal => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    e.code(),
                    "Internal server error".to_string(),
                ),
            },

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => {
                    (StatusCode::CONFLICT, "DUPLICATE_ENTRY", e.to_string())
                }
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                ),
                DatabaseError::UnexpectedError(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                ),
            },

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Auth(e) => match e.outcome() {
                Outcome::Unauthenticated => {
                    tracing::warn!(request_id = request_id, code = e.code(), "Authentication failed");
                }
                Outcome::Forbidden => {
                    tracing::warn!(request_id = request_id, code = e.code(), "Authorization denied");
                }
                Outcome::Internal => {
                    tracing::error!(request_id = request_id, error = %e, "Credential processing error");
                }
            },
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self.outcome() {
            Outcome::Unauthenticated => StatusCode::UNAUTHORIZED,
            Outcome::Forbidden => StatusCode::FORBIDDEN,
            Outcome::Internal => match self {
                AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                    StatusCode::CONFLICT
                }
                AppError::Database(DatabaseError::ConnectionPool(_)) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}
