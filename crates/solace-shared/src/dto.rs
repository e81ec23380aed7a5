//! Data Transfer Objects - request/response bodies for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Body of `POST /signup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

/// Response of `POST /signup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub uid: String,
}

/// Body of `POST /posts`.
///
/// `user_id` is accepted for compatibility with older clients but never used:
/// the author is always the authenticated subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub anonymous: bool,
}

/// Response of `POST /posts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub message: String,
    pub id: i64,
}

/// A post as shown to readers. `user_id` is `None` for anonymous posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub user_id: Option<String>,
    pub content: String,
    pub anonymous: bool,
    pub created_at: DateTime<Utc>,
}
