//! User aggregate
//!
//! Contains the User entity and the credential store interface.

pub mod model;
pub mod repository;

pub use model::User;
pub use repository::CredentialStore;
