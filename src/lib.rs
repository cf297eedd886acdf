//! # CourseMate Auth Service
//!
//! Issues and validates short-lived bearer tokens (HS256 JWTs) for a fixed
//! set of users, and gates protected endpoints behind them.
//!
//! ## Architecture
//!
//! - **domain**: the user record and the `CredentialStore` contract
//! - **application**: `AuthService`, the login and verification use cases
//! - **infrastructure**: bcrypt, token signing, the in-memory store
//! - **interfaces**: axum router, bearer middleware and handlers
//! - **shared**: error taxonomy and graceful shutdown
//! - **config** / **server**: configuration loading and process lifecycle

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use application::AuthService;
pub use config::{default_config_path, AppConfig, ConfigError};
pub use infrastructure::{InMemoryCredentialStore, JwtConfig, TokenService};
pub use interfaces::http::{create_api_router, AppState};
pub use server::{build_auth_service, init_tracing, ServerError, ServerHandle};
