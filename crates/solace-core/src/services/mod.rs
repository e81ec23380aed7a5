//! Data access services.
//!
//! These translate validated domain input into repository calls. They stamp
//! timestamps, hash credentials and enforce the email uniqueness rule; errors
//! are annotated and returned, never recovered here.

mod posts;
mod users;

pub use posts::PostService;
pub use users::{Registration, UserService};

#[cfg(test)]
pub(crate) mod test_support;
