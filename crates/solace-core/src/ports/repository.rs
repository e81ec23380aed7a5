use async_trait::async_trait;

use crate::domain::{NewPost, NewUser, Post, User};
use crate::error::RepoError;

/// User storage.
///
/// Implementations must enforce email uniqueness themselves and report a
/// second insert of the same email as [`RepoError::Duplicate`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user and return it with its store-assigned id.
    async fn insert(&self, user: NewUser) -> Result<User, RepoError>;

    /// Find a user by exact email match.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
}

/// Post storage. Posts are append-only.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Persist a new post and return it with its store-assigned id.
    async fn insert(&self, post: NewPost) -> Result<Post, RepoError>;

    /// All posts in insertion order. A record that fails to decode fails the
    /// whole call with [`RepoError::Decode`].
    async fn list_all(&self) -> Result<Vec<Post>, RepoError>;
}
