//! Middleware and request guards.

pub mod auth;
pub mod error;
