use std::sync::Arc;

use crate::domain::{NewUser, User, mask_email};
use crate::error::{DomainError, RepoError};
use crate::ports::{PasswordService, UserRepository};

/// Input for [`UserService::register`]. The password is the raw credential.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// User registration and lookup.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, passwords: Arc<dyn PasswordService>) -> Self {
        Self { users, passwords }
    }

    /// Register a new user.
    ///
    /// The lookup before insert only catches the common case; two concurrent
    /// registrations can both pass it. The repository's unique constraint
    /// settles that race and its duplicate-key error is reported as
    /// [`DomainError::Conflict`] as well.
    pub async fn register(&self, registration: Registration) -> Result<User, DomainError> {
        validate(&registration)?;

        let masked = mask_email(&registration.email);
        if self.users.find_by_email(&registration.email).await?.is_some() {
            tracing::debug!(user_email = %masked, "Registration rejected: email taken");
            return Err(DomainError::Conflict("User already exists".to_string()));
        }

        let password_hash = self
            .passwords
            .hash(&registration.password)
            .map_err(DomainError::from)?;

        let user = NewUser::new(registration.email, registration.username, password_hash);
        match self.users.insert(user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, user_email = %masked, "User registered");
                Ok(user)
            }
            Err(RepoError::Duplicate(_)) => {
                tracing::debug!(user_email = %masked, "Registration lost uniqueness race");
                Err(DomainError::Conflict("User already exists".to_string()))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create user");
                Err(e.into())
            }
        }
    }

    /// Exact-match lookup. A miss is [`DomainError::NotFound`], distinct from
    /// a storage failure.
    pub async fn find_by_email(&self, email: &str) -> Result<User, DomainError> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity_type: "User",
                key: mask_email(email),
            })
    }
}

fn validate(registration: &Registration) -> Result<(), DomainError> {
    let email = registration.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::Validation("Invalid email address".to_string()));
    }
    if registration.username.trim().is_empty() {
        return Err(DomainError::Validation("Username is required".to_string()));
    }
    if registration.password.is_empty() {
        return Err(DomainError::Validation("Password is required".to_string()));
    }
    Ok(())
}
