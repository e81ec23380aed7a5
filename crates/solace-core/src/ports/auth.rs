//! Authentication ports: the external identity provider and password hashing.

use async_trait::async_trait;

/// The identity behind a bearer token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Subject identifier issued by the identity provider.
    pub subject: String,
    pub email: Option<String>,
}

/// External identity provider: verifies bearer tokens and issues credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token and return the identity it was issued to.
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;

    /// Create a credential at the provider, returning the new subject id.
    async fn create_credential(&self, email: &str, password: &str) -> Result<String, AuthError>;
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password with a fresh salt.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Credential already exists")]
    CredentialExists,

    #[error("Credential rejected: {0}")]
    Rejected(String),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Hashing error: {0}")]
    HashingError(String),
}
