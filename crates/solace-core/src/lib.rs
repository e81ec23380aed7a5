//! # Solace Core
//!
//! The domain layer of the Solace backend.
//! Entities, ports and the data access services live here; this crate has
//! no infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{DomainError, RepoError};
pub use services::{PostService, Registration, UserService};
