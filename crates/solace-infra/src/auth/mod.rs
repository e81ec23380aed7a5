//! Authentication implementations.

mod firebase;
mod password;

pub use firebase::{FirebaseIdentityProvider, ServiceAccount};
pub use password::Argon2PasswordService;
