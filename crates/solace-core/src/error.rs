//! Domain-level error types.

use thiserror::Error;

use crate::ports::AuthError;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity_type} not found: {key}")]
    NotFound {
        entity_type: &'static str,
        key: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuth | AuthError::InvalidToken(_) | AuthError::TokenExpired => {
                DomainError::Unauthorized
            }
            AuthError::CredentialExists => {
                DomainError::Conflict("Email already registered".to_string())
            }
            AuthError::Rejected(msg) => DomainError::Validation(msg),
            AuthError::Provider(msg) => DomainError::IdentityProvider(msg),
            AuthError::HashingError(msg) => DomainError::Internal(msg),
        }
    }
}

/// Repository-level errors.
///
/// A lookup miss is not an error at this level; repositories return `Ok(None)`.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Record could not be decoded: {0}")]
    Decode(String),

    #[error("Duplicate key: {0}")]
    Duplicate(String),
}
