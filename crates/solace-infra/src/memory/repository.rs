use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use solace_core::domain::{NewPost, NewUser, Post, User, mask_email};
use solace_core::error::RepoError;
use solace_core::ports::{PostRepository, UserRepository};

#[derive(Default)]
struct UserTable {
    rows: Vec<User>,
    by_email: HashMap<String, usize>,
}

/// In-memory user repository.
///
/// The uniqueness check and the insert happen under one write lock, which
/// gives the same guarantee as a unique index.
/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let mut table = self.table.write().await;
        if table.by_email.contains_key(&user.email) {
            return Err(RepoError::Duplicate(format!(
                "email {}",
                mask_email(&user.email)
            )));
        }

        let index = table.rows.len();
        let user = user.into_user(index as i64 + 1);
        table.by_email.insert(user.email.clone(), index);
        table.rows.push(user.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let table = self.table.read().await;
        Ok(table
            .by_email
            .get(email)
            .map(|&index| table.rows[index].clone()))
    }
}

/// In-memory, append-only post repository.
#[derive(Default)]
pub struct InMemoryPostRepository {
    rows: RwLock<Vec<Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post, RepoError> {
        let mut rows = self.rows.write().await;
        let post = post.into_post(rows.len() as i64 + 1);
        rows.push(post.clone());
        Ok(post)
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        Ok(self.rows.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use solace_core::error::DomainError;
    use solace_core::ports::{AuthError, PasswordService};
    use solace_core::services::{Registration, UserService};

    struct PlainPasswords;

    impl PasswordService for PlainPasswords {
        fn hash(&self, password: &str) -> Result<String, AuthError> {
            Ok(format!("hashed:{password}"))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let repo = InMemoryUserRepository::new();
        let user = NewUser::new("a@b.com".into(), "a".into(), "h".into());

        repo.insert(user.clone()).await.unwrap();
        let err = repo.insert(user).await.unwrap_err();

        assert!(matches!(err, RepoError::Duplicate(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_by_email_is_exact() {
        let repo = InMemoryUserRepository::new();
        repo.insert(NewUser::new("a@b.com".into(), "a".into(), "h".into()))
            .await
            .unwrap();

        assert!(repo.find_by_email("a@b.com").await.unwrap().is_some());
        assert!(repo.find_by_email("A@B.COM").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_of_one_email() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = UserService::new(repo.clone(), Arc::new(PlainPasswords));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .register(Registration {
                            email: "same@b.com".to_string(),
                            username: format!("user{i}"),
                            password: "p".to_string(),
                        })
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for result in futures::future::join_all(handles).await {
            match result.unwrap() {
                Ok(_) => successes += 1,
                Err(DomainError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 31);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_posts_keep_insertion_order() {
        let repo = InMemoryPostRepository::new();
        for content in ["one", "two"] {
            repo.insert(NewPost::new("uid".into(), content.into(), false))
                .await
                .unwrap();
        }

        let posts = repo.list_all().await.unwrap();

        assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(posts[0].content, "one");
    }
}
