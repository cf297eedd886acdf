//! Infrastructure layer - external concerns

pub mod crypto;
pub mod storage;

pub use crypto::{JwtConfig, TokenService};
pub use storage::InMemoryCredentialStore;
