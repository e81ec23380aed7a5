use std::sync::Arc;

use crate::domain::{NewPost, Post};
use crate::error::DomainError;
use crate::ports::PostRepository;

/// Post creation and listing.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts }
    }

    /// Create a post authored by `author`, the verified subject of the request.
    pub async fn create_post(
        &self,
        author: &str,
        content: String,
        anonymous: bool,
    ) -> Result<Post, DomainError> {
        let post = NewPost::new(author.to_string(), content, anonymous);
        let post = self.posts.insert(post).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to create post");
            DomainError::from(e)
        })?;

        tracing::debug!(post_id = post.id, anonymous, "Post created");
        Ok(post)
    }

    /// Every post in insertion order.
    pub async fn list_posts(&self) -> Result<Vec<Post>, DomainError> {
        self.posts.list_all().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list posts");
            DomainError::from(e)
        })
    }
}
