//! In-test repository fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{NewPost, NewUser, Post, User};
use crate::error::RepoError;
use crate::ports::{AuthError, PasswordService, PostRepository, UserRepository};

#[derive(Default)]
pub struct MemoryUsers {
    users: RwLock<HashMap<String, User>>,
    fail: RwLock<bool>,
}

impl MemoryUsers {
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn fail_next(&self) {
        *self.fail.write().await = true;
    }

    async fn check_failure(&self) -> Result<(), RepoError> {
        let mut fail = self.fail.write().await;
        if std::mem::take(&mut *fail) {
            return Err(RepoError::Query("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        self.check_failure().await?;
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(RepoError::Duplicate(user.email));
        }
        let user = user.into_user(users.len() as i64 + 1);
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.check_failure().await?;
        let found = self.users.read().await.get(email).cloned();
        // Let concurrent registrations interleave between lookup and insert.
        tokio::task::yield_now().await;
        Ok(found)
    }
}

#[derive(Default)]
pub struct MemoryPosts {
    posts: RwLock<Vec<Post>>,
    fail: RwLock<bool>,
}

impl MemoryPosts {
    pub async fn fail_next(&self) {
        *self.fail.write().await = true;
    }
}

#[async_trait]
impl PostRepository for MemoryPosts {
    async fn insert(&self, post: NewPost) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        let post = post.into_post(posts.len() as i64 + 1);
        posts.push(post.clone());
        Ok(post)
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        if std::mem::take(&mut *self.fail.write().await) {
            return Err(RepoError::Query("injected failure".to_string()));
        }
        Ok(self.posts.read().await.clone())
    }
}

pub struct FakePasswords;

impl FakePasswords {
    pub fn hashed(password: &str) -> String {
        format!("fake${}", password.chars().rev().collect::<String>())
    }
}

impl PasswordService for FakePasswords {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(Self::hashed(password))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(Self::hashed(password) == hash)
    }
}
