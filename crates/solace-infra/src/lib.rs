//! # Solace Infrastructure
//!
//! Concrete implementations of the ports defined in `solace-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - In-memory repositories only
//! - `postgres` - PostgreSQL repositories via SeaORM
//! - `auth` - Argon2 password hashing and the Firebase identity provider

pub mod database;
pub mod memory;

#[cfg(feature = "auth")]
pub mod auth;

pub use database::DatabaseConfig;
pub use memory::{InMemoryPostRepository, InMemoryUserRepository};

#[cfg(feature = "postgres")]
pub use database::{SeaOrmPostRepository, SeaOrmUserRepository};

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, FirebaseIdentityProvider, ServiceAccount};
