//! Database connection management and SeaORM repositories.

mod connections;

#[cfg(feature = "postgres")]
mod repository;

#[cfg(feature = "postgres")]
pub mod entity;

pub use connections::DatabaseConfig;

#[cfg(feature = "postgres")]
pub use connections::connect;

#[cfg(feature = "postgres")]
pub use repository::{SeaOrmPostRepository, SeaOrmRepository, SeaOrmUserRepository};
