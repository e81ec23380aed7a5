//! Application state - shared across all handlers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use solace_core::ports::{IdentityProvider, PasswordService, PostRepository, UserRepository};
use solace_core::{DomainError, PostService, UserService};
use solace_infra::{Argon2PasswordService, FirebaseIdentityProvider};
use solace_infra::{InMemoryPostRepository, InMemoryUserRepository};

#[cfg(feature = "postgres")]
use solace_infra::{SeaOrmPostRepository, SeaOrmUserRepository, database};

use crate::config::AppConfig;
use crate::middleware::error::{AppError, AppResult};

/// Shared application state. Every collaborator is constructed once in
/// [`AppState::new`] and handed to workers by clone.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub posts: PostService,
    pub identity: Arc<dyn IdentityProvider>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Build the application state with the configured implementations.
    ///
    /// Unusable identity provider credentials are fatal. A database that cannot
    /// be reached falls back to in-memory storage.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let identity = FirebaseIdentityProvider::from_credentials_file(
            &config.firebase_credentials,
            config.request_timeout,
        )
        .with_context(|| {
            format!(
                "cannot initialize identity provider from {}",
                config.firebase_credentials.display()
            )
        })?;

        let (users, posts) = Self::repositories(config).await;
        let state = Self::from_parts(
            users,
            posts,
            Arc::new(Argon2PasswordService::new()),
            Arc::new(identity),
            config.request_timeout,
        );

        tracing::info!("Application state initialized");
        Ok(state)
    }

    pub fn from_parts(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        passwords: Arc<dyn PasswordService>,
        identity: Arc<dyn IdentityProvider>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            users: UserService::new(users, passwords),
            posts: PostService::new(posts),
            identity,
            request_timeout,
        }
    }

    #[cfg(feature = "postgres")]
    async fn repositories(config: &AppConfig) -> (Arc<dyn UserRepository>, Arc<dyn PostRepository>) {
        let Some(db_config) = config.database.as_ref() else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Self::in_memory_repositories();
        };

        let connected = match database::connect(db_config).await {
            Ok(conn) if config.auto_migrate => {
                use migration::MigratorTrait;
                migration::Migrator::up(&conn, None).await.map(|()| conn)
            }
            other => other,
        };

        match connected {
            Ok(conn) => (
                Arc::new(SeaOrmUserRepository::new(conn.clone())),
                Arc::new(SeaOrmPostRepository::new(conn)),
            ),
            Err(e) => {
                tracing::error!(
                    "Failed to prepare database: {}. Using in-memory fallback.",
                    e
                );
                Self::in_memory_repositories()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn repositories(_config: &AppConfig) -> (Arc<dyn UserRepository>, Arc<dyn PostRepository>) {
        tracing::info!("Running without postgres feature - using in-memory repositories");
        Self::in_memory_repositories()
    }

    fn in_memory_repositories() -> (Arc<dyn UserRepository>, Arc<dyn PostRepository>) {
        (
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryPostRepository::new()),
        )
    }

    /// Run downstream work under the request deadline. Dropping the future on
    /// expiry cancels whatever store or provider call is in flight.
    pub async fn within_deadline<T, F>(&self, work: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.request_timeout, work).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Request deadline exceeded"
                );
                Err(AppError::Timeout)
            }
        }
    }
}
