use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as stored.
///
/// `user_id` is kept even for anonymous posts; hiding it from readers is the
/// job of the response layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: String,
    pub content: String,
    pub anonymous: bool,
    pub created_at: DateTime<Utc>,
}

/// A post that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub user_id: String,
    pub content: String,
    pub anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl NewPost {
    /// Create a post authored by `user_id`, stamped with the current time.
    pub fn new(user_id: String, content: String, anonymous: bool) -> Self {
        Self {
            user_id,
            content,
            anonymous,
            created_at: Utc::now(),
        }
    }

    pub fn into_post(self, id: i64) -> Post {
        Post {
            id,
            user_id: self.user_id,
            content: self.content,
            anonymous: self.anonymous,
            created_at: self.created_at,
        }
    }
}
