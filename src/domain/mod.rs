//! Domain layer: the user record and the credential store contract.

pub mod error;
pub mod user;

pub use error::{DomainError, DomainResult};
pub use user::{CredentialStore, User};
