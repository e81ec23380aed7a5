use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    /// PHC-formatted one-way hash; never the raw password.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A user that has not been persisted yet. The store assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// Stamp a new user with the current time.
    pub fn new(email: String, username: String, password_hash: String) -> Self {
        Self {
            email,
            username,
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn into_user(self, id: i64) -> User {
        User {
            id,
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            created_at: self.created_at,
        }
    }
}

/// Mask an email for logging: `alice@example.com` becomes `a***@example.com`.
pub fn mask_email(email: &str) -> String {
    match email.find('@') {
        Some(at_pos) => {
            let (local, domain) = email.split_at(at_pos);
            match local.chars().next() {
                Some(first) if local.chars().count() > 1 => format!("{first}***{domain}"),
                _ => format!("***{domain}"),
            }
        }
        None => "***".to_string(),
    }
}
